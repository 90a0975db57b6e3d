use std::sync::Mutex;
use std::time::Duration;

use vigil::config::{Config, ConfigError};
use vigil::server::tls::TlsVersion;

// Environment variables are process-global; serialize these tests.
static TEST_LOCK: Mutex<()> = Mutex::new(());

const ALL_KEYS: &[&str] = &[
    "VIGIL_PORT",
    "VIGIL_READ_TIMEOUT_MS",
    "VIGIL_WRITE_TIMEOUT_MS",
    "VIGIL_SHUTDOWN_DEADLINE_MS",
    "VIGIL_REQUEST_TIMEOUT_MS",
    "VIGIL_TLS_CERT_FILE",
    "VIGIL_TLS_KEY_FILE",
    "VIGIL_TLS_MIN_VERSION",
];

fn with_env<F>(vars: &[(&str, &str)], test: F)
where
    F: FnOnce(),
{
    let _lock = TEST_LOCK.lock().unwrap();

    for key in ALL_KEYS {
        unsafe {
            std::env::remove_var(key);
        }
    }
    for (key, value) in vars {
        unsafe {
            std::env::set_var(key, value);
        }
    }

    test();

    for key in ALL_KEYS {
        unsafe {
            std::env::remove_var(key);
        }
    }
}

fn tls_files<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("VIGIL_TLS_CERT_FILE", "tests/testdata/cert.pem"),
        ("VIGIL_TLS_KEY_FILE", "tests/testdata/key.pem"),
    ]
}

#[test]
fn test_config_defaults() {
    with_env(&tls_files(), || {
        let cfg = Config::from_env().unwrap();

        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.write_timeout, Some(Duration::from_secs(5)));
        assert_eq!(cfg.shutdown_deadline, Duration::from_secs(10));
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
        assert_eq!(cfg.tls_min_version, TlsVersion::Tls13);
    });
}

#[test]
fn test_config_overrides() {
    let mut vars = tls_files();
    vars.extend([
        ("VIGIL_PORT", "3000"),
        ("VIGIL_READ_TIMEOUT_MS", "1500"),
        ("VIGIL_WRITE_TIMEOUT_MS", "2500"),
        ("VIGIL_SHUTDOWN_DEADLINE_MS", "30000"),
        ("VIGIL_REQUEST_TIMEOUT_MS", "750"),
        ("VIGIL_TLS_MIN_VERSION", "1.2"),
    ]);

    with_env(&vars, || {
        let cfg = Config::from_env().unwrap();

        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.read_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(cfg.write_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(cfg.shutdown_deadline, Duration::from_millis(30000));
        assert_eq!(cfg.request_timeout, Duration::from_millis(750));
        assert_eq!(cfg.tls_min_version, TlsVersion::Tls12);
    });
}

#[test]
fn test_config_zero_timeout_disables_deadline() {
    let mut vars = tls_files();
    vars.extend([
        ("VIGIL_READ_TIMEOUT_MS", "0"),
        ("VIGIL_WRITE_TIMEOUT_MS", "0"),
    ]);

    with_env(&vars, || {
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.read_timeout, None);
        assert_eq!(cfg.write_timeout, None);
    });
}

#[test]
fn test_config_port_accepts_colon_prefix() {
    let mut vars = tls_files();
    vars.push(("VIGIL_PORT", ":9090"));

    with_env(&vars, || {
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:9090");
    });
}

#[test]
fn test_config_invalid_port() {
    for bad in ["0", "notaport", "70000"] {
        let mut vars = tls_files();
        vars.push(("VIGIL_PORT", bad));
        with_env(&vars, || {
            assert!(matches!(
                Config::from_env(),
                Err(ConfigError::InvalidPort { .. })
            ));
        });
    }
}

#[test]
fn test_config_invalid_duration() {
    let mut vars = tls_files();
    vars.push(("VIGIL_READ_TIMEOUT_MS", "5s"));
    with_env(&vars, || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    });
}

#[test]
fn test_config_missing_cert_file_env() {
    with_env(&[("VIGIL_TLS_KEY_FILE", "tests/testdata/key.pem")], || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingValue {
                key: "VIGIL_TLS_CERT_FILE"
            })
        ));
    });
}

#[test]
fn test_config_nonexistent_cert_file() {
    let vars = [
        ("VIGIL_TLS_CERT_FILE", "tests/testdata/nope.pem"),
        ("VIGIL_TLS_KEY_FILE", "tests/testdata/key.pem"),
    ];
    with_env(&vars, || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::FileNotFound { .. })
        ));
    });
}

#[test]
fn test_config_invalid_tls_version() {
    let mut vars = tls_files();
    vars.push(("VIGIL_TLS_MIN_VERSION", "1.1"));
    with_env(&vars, || {
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidTlsVersion { .. })
        ));
    });
}
