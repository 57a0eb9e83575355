use crate::{
    cli::{Config, commands},
    event::Event,
    pipeline,
    s3::{Credentials, Region, S3, limits::MIN_PART_SIZE_BYTES},
    stream::RetryPolicy,
    transcode::SourceEncoding,
};
use anyhow::{Context, Result, anyhow};
use bytesize::ByteSize;
use clap::ArgMatches;
use colored::Colorize;
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    time::Duration,
};

/// Everything the binary needs to run a batch
#[derive(Debug)]
pub struct Settings {
    pub s3: S3,
    pub config: pipeline::Config,
    pub event: Event,
}

#[must_use]
pub fn get_config_path() -> PathBuf {
    let home_dir = dirs::home_dir().map_or_else(|| PathBuf::from("/tmp"), |h| h);

    Path::new(&home_dir).join(".config").join("s3recode")
}

/// # Errors
///
/// Will return `Err` if the options, the config file or the event are invalid
pub fn start() -> Result<Settings> {
    let config_path = get_config_path();

    // start the command line interface
    let matches = commands::new(&config_path).get_matches();

    let verbosity_level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };

    env_logger::Builder::new()
        .filter_level(verbosity_level)
        .init();

    log::info!("config path: {}", config_path.display());

    settings(&matches)
}

/// # Errors
///
/// Will return `Err` if the options, the config file or the event are invalid
pub fn settings(matches: &ArgMatches) -> Result<Settings> {
    let config = recode_config(matches)?;

    log::info!(
        "source encoding: {}, chunk size: {}, marker: {}",
        config.encoding,
        config.chunk_size,
        config.marker
    );

    let s3 = s3_client(matches)?;

    log::debug!("S3:\n{s3}");

    let event = read_event(matches)?;

    log::info!("records: {}", event.records.len());

    Ok(Settings { s3, config, event })
}

fn recode_config(matches: &ArgMatches) -> Result<pipeline::Config> {
    let encoding = matches
        .get_one::<SourceEncoding>("source-encoding")
        .copied()
        .context("missing source encoding")?;

    let mut config = pipeline::Config::new(encoding);

    if let Some(chunk_size) = matches.get_one::<u64>("chunk-size") {
        config.chunk_size = *chunk_size;
    }

    // every part but the last must reach the store minimum once decoded
    let min_chunk_size = encoding.min_chunk_size(MIN_PART_SIZE_BYTES);
    if config.chunk_size < min_chunk_size {
        return Err(anyhow!(
            "chunk size {} is too small for {encoding}, parts could decode to less than {}, use at least {min_chunk_size} bytes",
            config.chunk_size,
            ByteSize(MIN_PART_SIZE_BYTES)
        ));
    }

    if let Some(marker) = matches.get_one::<String>("marker") {
        config.marker.clone_from(marker);
    }

    // the first attempt plus the retries
    let retries = matches.get_one::<u32>("retries").copied().unwrap_or(3);
    config.retry = RetryPolicy::new(retries.saturating_add(1), Duration::from_secs(1));

    config.timeout = matches
        .get_one::<u64>("timeout")
        .map(|secs| Duration::from_secs(*secs));

    config.max_requests = matches
        .get_one::<u8>("max-requests")
        .map_or(1, |n| usize::from(*n));

    config.validate()?;

    Ok(config)
}

fn s3_client(matches: &ArgMatches) -> Result<S3> {
    let host_name = matches
        .get_one::<String>("host")
        .map_or("default", String::as_str);

    // the config file is optional, the environment is used without it
    let (mut region, credentials) = match matches
        .get_one::<PathBuf>("config")
        .filter(|path| path.is_file())
    {
        Some(path) => {
            let config = Config::new(path)?;

            log::debug!("config: {config:#?}");

            let host = config.get_host(host_name).map_err(|_| {
                anyhow!(
                    "Could not find host: \"{}\". Check config file {}, For more information try {}",
                    host_name.red(),
                    path.display(),
                    "--help".green()
                )
            })?;

            (host.get_region()?, host.credentials())
        }

        None => (Region::from_env(), Credentials::from_env_or("", "")),
    };

    let region_name = matches.get_one::<String>("region");

    if let Some(endpoint) = matches.get_one::<String>("endpoint") {
        let name = region_name.map_or_else(|| region.name().to_string(), Clone::clone);
        region = Region::Custom {
            name,
            endpoint: endpoint.clone(),
        };
    } else if let Some(name) = region_name {
        region = match region {
            Region::Custom { endpoint, .. } => Region::Custom {
                name: name.clone(),
                endpoint,
            },
            Region::Aws(_) => name.parse()?,
        };
    }

    if credentials.aws_access_key_id().is_empty() {
        log::warn!("no access key found in the config file or AWS_ACCESS_KEY_ID");
    }

    S3::new(&credentials, &region, None)
}

fn read_event(matches: &ArgMatches) -> Result<Event> {
    match matches.get_one::<PathBuf>("event") {
        Some(path) if path.as_os_str() == "-" => Ok(Event::from_reader(io::stdin().lock())?),

        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("unable to open event: {}", path.display()))?;
            Ok(Event::from_reader(BufReader::new(file))?)
        }

        None => {
            let bucket = matches
                .get_one::<String>("bucket")
                .context("missing bucket, use --bucket or --event")?;
            let key = matches
                .get_one::<String>("key")
                .context("missing key, use --key or --event")?;

            Ok(Event::single(bucket, key))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const CONF: &str = r"---
hosts:
  default:
    region: eu-west-1
    access_key: XXX
    secret_key: YYY
  minio:
    endpoint: http://localhost:9000
    access_key: minioadmin
    secret_key: minioadmin";

    const EVENT: &str = r#"{"Records": [
        {"s3": {"bucket": {"name": "one"}, "object": {"key": "latin-1/a.txt"}}},
        {"s3": {"bucket": {"name": "two"}, "object": {"key": "latin-1/b+c.txt"}}}
    ]}"#;

    const VARS: [&str; 16] = [
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
        "AWS_DEFAULT_REGION",
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "RETRIES",
        "TIMEOUT",
        "MAX_REQUESTS",
    ];

    fn config_dir() -> TempDir {
        let tmp_dir = TempDir::new().unwrap();
        let mut file = File::create(tmp_dir.path().join("config.yml")).unwrap();
        file.write_all(CONF.as_bytes()).unwrap();
        let mut file = File::create(tmp_dir.path().join("event.json")).unwrap();
        file.write_all(EVENT.as_bytes()).unwrap();
        tmp_dir
    }

    fn run(config_path: &Path, args: &[&str]) -> Result<Settings> {
        temp_env::with_vars_unset(VARS, || {
            let matches = commands::new(config_path).try_get_matches_from(args)?;
            settings(&matches)
        })
    }

    #[test]
    fn test_get_config_path() {
        assert!(get_config_path().ends_with(".config/s3recode"));
    }

    #[test]
    fn test_settings_single_record() {
        let dir = config_dir();
        let settings = run(
            dir.path(),
            &["s3recode", "-e", "latin-1", "-b", "bucket", "-k", "latin-1/file.txt", "-n", "4"],
        )
        .unwrap();

        assert_eq!(settings.event, Event::single("bucket", "latin-1/file.txt"));
        assert_eq!(settings.config.encoding, SourceEncoding::Latin1);
        assert_eq!(settings.config.chunk_size, 52_428_800);
        assert_eq!(settings.config.marker, "utf-8");
        assert_eq!(settings.config.max_requests, 4);
        assert_eq!(settings.config.retry.attempts, 4);
        assert!(settings.config.timeout.is_none());

        assert_eq!(settings.s3.region(), &Region::Aws("eu-west-1".to_string()));
        assert_eq!(settings.s3.credentials().aws_access_key_id(), "XXX");
    }

    #[test]
    fn test_settings_event_file() {
        let dir = config_dir();
        let event = dir.path().join("event.json");
        let settings = run(
            dir.path(),
            &[
                "s3recode",
                "-e",
                "cp1252",
                "--event",
                event.to_str().unwrap(),
                "--host",
                "minio",
                "--timeout",
                "60",
            ],
        )
        .unwrap();

        assert_eq!(settings.event.records.len(), 2);
        assert_eq!(settings.event.records[1].bucket(), "two");
        assert_eq!(settings.event.records[1].source_key(), "latin-1/b c.txt");
        assert_eq!(settings.config.timeout, Some(Duration::from_secs(60)));
        assert_eq!(
            settings.s3.region(),
            &Region::Custom {
                name: String::new(),
                endpoint: "http://localhost:9000".to_string()
            }
        );
    }

    #[test]
    fn test_settings_missing_event_file() {
        let dir = config_dir();
        let missing = dir.path().join("missing.json");
        assert!(run(
            dir.path(),
            &["s3recode", "-e", "utf-8", "--event", missing.to_str().unwrap()]
        )
        .is_err());
    }

    #[test]
    fn test_settings_chunk_size_per_encoding() {
        let dir = config_dir();
        let args = |encoding: &str, size: &str| {
            run(
                dir.path(),
                &["s3recode", "-e", encoding, "-s", size, "-b", "b", "-k", "k"],
            )
        };

        assert_eq!(args("latin-1", "5MiB").unwrap().config.chunk_size, 5_242_880);

        // UTF-16 text may shrink to half its size
        let err = args("utf-16le", "5MiB").unwrap_err();
        assert!(err.to_string().contains("too small for UTF-16LE"), "{err}");
        assert!(args("utf-16le", "10MiB").is_err());
        assert_eq!(args("utf-16le", "11MiB").unwrap().config.chunk_size, 11_534_336);

        assert!(args("utf-8", "5MiB").is_err());
        assert!(args("utf-8", "6MiB").is_ok());
        assert!(args("shift_jis", "5MiB").is_err());
    }

    #[test]
    fn test_settings_retries() {
        let dir = config_dir();
        let settings = run(
            dir.path(),
            &["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--retries", "0"],
        )
        .unwrap();
        assert_eq!(settings.config.retry.attempts, 1);

        let settings = run(
            dir.path(),
            &["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "-r", "5"],
        )
        .unwrap();
        assert_eq!(settings.config.retry.attempts, 6);
    }

    #[test]
    fn test_settings_unknown_host() {
        let dir = config_dir();
        let err = run(
            dir.path(),
            &["s3recode", "-e", "utf-8", "-b", "b", "-k", "k", "--host", "nope"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("Could not find host"));
    }

    #[test]
    fn test_settings_endpoint_override() {
        let dir = config_dir();
        let settings = run(
            dir.path(),
            &[
                "s3recode",
                "-e",
                "utf-8",
                "-b",
                "b",
                "-k",
                "k",
                "--endpoint",
                "http://127.0.0.1:9000",
            ],
        )
        .unwrap();

        assert_eq!(
            settings.s3.region(),
            &Region::Custom {
                name: "eu-west-1".to_string(),
                endpoint: "http://127.0.0.1:9000".to_string()
            }
        );
    }

    #[test]
    fn test_settings_without_config_file() {
        let dir = TempDir::new().unwrap();
        let settings = temp_env::with_vars(
            [
                ("AWS_ACCESS_KEY_ID", Some("ENV_KEY")),
                ("AWS_SECRET_ACCESS_KEY", Some("ENV_SECRET")),
                ("AWS_REGION", Some("us-west-2")),
                ("SOURCE_ENCODING", Some("shift_jis")),
                ("BUCKET", Some("bucket")),
                ("S3_FILE", Some("sjis/file.txt")),
                ("CHUNK_SIZE", Some("12MiB")),
                ("AWS_DEFAULT_REGION", None),
                ("AWS_ENDPOINT_URL", None),
                ("S3RECODE_CONFIG", None),
                ("S3RECODE_HOST", None),
                ("S3_EVENT", None),
                ("TARGET_MARKER", None),
                ("MAX_REQUESTS", None),
                ("RETRIES", None),
                ("TIMEOUT", None),
            ],
            || {
                let matches = commands::new(dir.path())
                    .try_get_matches_from(["s3recode"])
                    .unwrap();
                settings(&matches).unwrap()
            },
        );

        assert_eq!(settings.config.chunk_size, 12_582_912);
        assert_eq!(settings.s3.region(), &Region::Aws("us-west-2".to_string()));
        assert_eq!(settings.s3.credentials().aws_access_key_id(), "ENV_KEY");
        assert_eq!(settings.event.records[0].bucket(), "bucket");
    }
}
