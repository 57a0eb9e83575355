use crate::{
    event::DEFAULT_MARKER,
    s3::limits::{MAX_PART_SIZE_BYTES, MIN_PART_SIZE_BYTES},
    transcode::SourceEncoding,
};
use bytesize::ByteSize;
use clap::{
    Arg, ColorChoice, Command,
    builder::ValueParser,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::{Path, PathBuf};

pub fn validator_encoding() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<SourceEncoding, String> {
        SourceEncoding::for_label(s).map_err(|e| e.to_string())
    })
}

pub fn validator_chunk_size() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<u64, String> {
        let size = s
            .parse::<ByteSize>()
            .map_err(|e| format!("Not a valid size: {e}"))?
            .as_u64();

        if size < MIN_PART_SIZE_BYTES {
            return Err(format!(
                "chunk size must be at least {} ({MIN_PART_SIZE_BYTES} bytes)",
                ByteSize(MIN_PART_SIZE_BYTES)
            ));
        }

        if size > MAX_PART_SIZE_BYTES {
            return Err(format!(
                "chunk size must be at most {} ({MAX_PART_SIZE_BYTES} bytes)",
                ByteSize(MAX_PART_SIZE_BYTES)
            ));
        }

        Ok(size)
    })
}

pub fn validator_marker() -> ValueParser {
    ValueParser::from(move |s: &str| -> std::result::Result<String, String> {
        if s.is_empty() || s.contains('/') {
            return Err(String::from("marker must be a single path segment"));
        }
        Ok(s.to_string())
    })
}

pub fn new(config_path: &Path) -> Command {
    // default: ~/.config/s3recode/config.yml
    let config_file_path = config_path.join("config.yml");

    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("s3recode")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Re-encode text objects stored in S3 to UTF-8")
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("source-encoding")
            .help("Encoding of the source objects, example: latin-1, windows-1252, shift_jis")
            .long("source-encoding")
            .short('e')
            .env("SOURCE_ENCODING")
            .required(true)
            .value_parser(validator_encoding())
            .value_name("encoding")
            .num_args(1)
        )
        .arg(
            Arg::new("chunk-size")
            .help("Bytes read per part, example: 50MiB, 5242880 (minimum 5MiB)")
            .long("chunk-size")
            .short('s')
            .env("CHUNK_SIZE")
            .default_value("50MiB")
            .value_parser(validator_chunk_size())
            .num_args(1)
        )
        .arg(
            Arg::new("marker")
            .help("First path segment of the target key")
            .long("marker")
            .env("TARGET_MARKER")
            .default_value(DEFAULT_MARKER)
            .value_parser(validator_marker())
            .num_args(1)
        )
        .arg(
            Arg::new("event")
            .help("S3 event notification JSON, \"-\" reads it from STDIN")
            .long("event")
            .env("S3_EVENT")
            .value_name("FILE")
            .value_parser(clap::value_parser!(PathBuf))
            .num_args(1)
        )
        .arg(
            Arg::new("bucket")
            .help("Bucket of the object to re-encode, used without --event")
            .long("bucket")
            .short('b')
            .env("BUCKET")
            .required_unless_present("event")
            .num_args(1)
        )
        .arg(
            Arg::new("key")
            .help("Key of the object to re-encode, used without --event")
            .long("key")
            .short('k')
            .env("S3_FILE")
            .required_unless_present("event")
            .num_args(1)
        )
        .arg(
            Arg::new("config")
            .default_value(config_file_path.into_os_string())
            .long("config")
            .short('c')
            .env("S3RECODE_CONFIG")
            .value_parser(clap::value_parser!(PathBuf))
            .value_name("config.yml")
            .num_args(1)
        )
        .arg(
            Arg::new("host")
            .help("Host entry of the config file")
            .long("host")
            .env("S3RECODE_HOST")
            .default_value("default")
            .num_args(1)
        )
        .arg(
            Arg::new("endpoint")
            .help("S3 compatible endpoint, example: http://localhost:9000")
            .long("endpoint")
            .env("AWS_ENDPOINT_URL")
            .num_args(1)
        )
        .arg(
            Arg::new("region")
            .help("Region used to sign the requests")
            .long("region")
            .env("AWS_REGION")
            .num_args(1)
        )
        .arg(
            Arg::new("retries")
            .help("Number of retries of a failed upload part")
            .long("retries")
            .short('r')
            .env("RETRIES")
            .default_value("3")
            .value_parser(clap::value_parser!(u32).range(0..=100))
            .num_args(1)
        )
        .arg(
            Arg::new("timeout")
            .help("Seconds allowed per record, the upload is aborted when exceeded")
            .long("timeout")
            .short('t')
            .env("TIMEOUT")
            .value_parser(clap::value_parser!(u64).range(1..))
            .num_args(1)
        )
        .arg(
            Arg::new("max-requests")
            .help("Number of records processed concurrently")
            .long("max-requests")
            .short('n')
            .env("MAX_REQUESTS")
            .default_value("1")
            .value_parser(clap::value_parser!(u8).range(1..=255))
            .num_args(1)
        )
        .arg(
            Arg::new("verbose")
            .help("Verbosity level")
            .short('v')
            .long("verbose")
            .action(clap::ArgAction::Count)
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VARS: [&str; 14] = [
        "SOURCE_ENCODING",
        "CHUNK_SIZE",
        "TARGET_MARKER",
        "S3_EVENT",
        "BUCKET",
        "S3_FILE",
        "S3RECODE_CONFIG",
        "S3RECODE_HOST",
        "AWS_ENDPOINT_URL",
        "AWS_REGION",
        "RETRIES",
        "TIMEOUT",
        "MAX_REQUESTS",
        "AWS_DEFAULT_REGION",
    ];

    fn matches(args: &[&str]) -> Result<clap::ArgMatches, clap::Error> {
        temp_env::with_vars_unset(VARS, || {
            new(Path::new("/tmp/s3recode")).try_get_matches_from(args)
        })
    }

    #[test]
    fn test_check_defaults() {
        let m = matches(&["s3recode", "-e", "latin-1", "-b", "bucket", "-k", "latin-1/file.txt"])
            .unwrap();

        assert_eq!(
            m.get_one::<SourceEncoding>("source-encoding").copied(),
            Some(SourceEncoding::Latin1)
        );
        assert_eq!(m.get_one::<u64>("chunk-size").copied(), Some(52_428_800));
        assert_eq!(
            m.get_one::<String>("marker").map(String::as_str),
            Some("utf-8")
        );
        assert_eq!(
            m.get_one::<String>("bucket").map(String::as_str),
            Some("bucket")
        );
        assert_eq!(
            m.get_one::<String>("key").map(String::as_str),
            Some("latin-1/file.txt")
        );
        assert_eq!(
            m.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("/tmp/s3recode/config.yml"))
        );
        assert_eq!(
            m.get_one::<String>("host").map(String::as_str),
            Some("default")
        );
        assert_eq!(m.get_one::<u32>("retries").copied(), Some(3));
        assert_eq!(m.get_one::<u8>("max-requests").copied(), Some(1));
        assert!(m.get_one::<u64>("timeout").is_none());
        assert!(m.get_one::<PathBuf>("event").is_none());
        assert_eq!(m.get_count("verbose"), 0);
    }

    #[test]
    fn test_source_encoding_required() {
        let err = matches(&["s3recode", "-b", "bucket", "-k", "key"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_source_encoding_invalid() {
        let err = matches(&["s3recode", "-e", "klingon", "-b", "b", "-k", "k"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_bucket_and_key_or_event() {
        assert!(matches(&["s3recode", "-e", "latin-1"]).is_err());
        assert!(matches(&["s3recode", "-e", "latin-1", "-b", "bucket"]).is_err());

        let m = matches(&["s3recode", "-e", "latin-1", "--event", "-"]).unwrap();
        assert_eq!(m.get_one::<PathBuf>("event"), Some(&PathBuf::from("-")));
    }

    #[test]
    fn test_chunk_size() {
        let tests = vec![
            ("5MiB", Some(5_242_880)),
            ("5242880", Some(5_242_880)),
            ("100MiB", Some(104_857_600)),
            ("1GiB", Some(1_073_741_824)),
            ("5MB", None),
            ("1024", None),
            ("6GiB", None),
            ("lots", None),
        ];
        for (size, expected) in tests {
            let m = matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-s", size]);
            match expected {
                Some(bytes) => assert_eq!(
                    m.unwrap().get_one::<u64>("chunk-size").copied(),
                    Some(bytes),
                    "{size}"
                ),
                None => assert!(m.is_err(), "{size}"),
            }
        }
    }

    #[test]
    fn test_marker() {
        let m = matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--marker", "out"])
            .unwrap();
        assert_eq!(m.get_one::<String>("marker").map(String::as_str), Some("out"));

        assert!(matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--marker", "a/b"]).is_err());
    }

    #[test]
    fn test_max_requests() {
        let m = matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-n", "8"]).unwrap();
        assert_eq!(m.get_one::<u8>("max-requests").copied(), Some(8));

        assert!(matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-n", "0"]).is_err());
        assert!(matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-n", "256"]).is_err());
    }

    #[test]
    fn test_timeout_and_retries() {
        let m = matches(&[
            "s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--timeout", "30", "--retries", "5",
        ])
        .unwrap();
        assert_eq!(m.get_one::<u64>("timeout").copied(), Some(30));
        assert_eq!(m.get_one::<u32>("retries").copied(), Some(5));

        assert!(matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--retries", "0"]).is_ok());
        assert!(matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--retries", "101"]).is_err());
    }

    #[test]
    fn test_verbose() {
        let m = matches(&["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-vv"]).unwrap();
        assert_eq!(m.get_count("verbose"), 2);
    }

    #[test]
    fn test_env() {
        temp_env::with_vars(
            [
                ("SOURCE_ENCODING", Some("shift_jis")),
                ("CHUNK_SIZE", Some("10MiB")),
                ("BUCKET", Some("my-bucket")),
                ("S3_FILE", Some("sjis/file.txt")),
                ("TARGET_MARKER", None),
                ("S3_EVENT", None),
                ("MAX_REQUESTS", None),
            ],
            || {
                let m = new(Path::new("/tmp/s3recode"))
                    .try_get_matches_from(["s3recode"])
                    .unwrap();
                assert_eq!(
                    m.get_one::<SourceEncoding>("source-encoding")
                        .map(SourceEncoding::name),
                    Some("Shift_JIS")
                );
                assert_eq!(m.get_one::<u64>("chunk-size").copied(), Some(10_485_760));
                assert_eq!(
                    m.get_one::<String>("bucket").map(String::as_str),
                    Some("my-bucket")
                );
                assert_eq!(
                    m.get_one::<String>("key").map(String::as_str),
                    Some("sjis/file.txt")
                );
            },
        );
    }
}
