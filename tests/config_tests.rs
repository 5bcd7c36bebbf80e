//! Config file loading and validation.

use std::io::Write;

use rust_decimal_macros::dec;
use tempfile::NamedTempFile;

use flashpath::config::Config;
use flashpath::error::{ConfigError, Error};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_a_full_config_file() {
    let file = write_config(
        r#"
        [engine]
        scan_interval_secs = 3
        trade_amount_usd = 25000
        sources = [
            { chain = "ethereum", dex = "uniswap_v3" },
            { chain = "polygon", dex = "quickswap" },
        ]

        [detectors]
        enabled = ["simple", "triangular"]

        [detectors.simple]
        min_spread_pct = 0.003

        [planner]
        max_slippage = 0.004

        [admission]
        floor_medium = 10.0

        [scheduler]
        max_concurrent_trades = 8
        batch_timeout_ms = 5000

        [[providers.flash_loan]]
        name = "aave_v3"
        fee_pct = 0.0009
        max_amount = 5000000

        [gas]
        price_gwei = 30

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.engine.scan_interval_secs, 3);
    assert_eq!(config.engine.sources.len(), 2);
    assert_eq!(config.detectors.simple.min_spread_pct, dec!(0.003));
    assert_eq!(config.planner.max_slippage, dec!(0.004));
    assert_eq!(config.admission.floor_medium, dec!(10.0));
    assert_eq!(config.scheduler.max_concurrent_trades, 8);
    assert_eq!(config.providers.flash_loan[0].name, "aave_v3");
    assert_eq!(config.gas.price_gwei, dec!(30));
    assert_eq!(config.logging.format, "json");
}

#[test]
fn missing_file_is_a_read_error() {
    let err = Config::load("/nonexistent/flashpath.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[engine\nsources = oops");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
}

#[test]
fn empty_sources_fail_validation() {
    let file = write_config("[engine]\nsources = []\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingField { field: "engine.sources" })
    ));
}

#[test]
fn negative_floor_fails_validation() {
    let file = write_config(
        r#"
        [engine]
        sources = [{ chain = "ethereum", dex = "uniswap_v3" }]

        [admission]
        floor_low = -1.0
        "#,
    );
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue { .. })
    ));
}

#[test]
fn engine_settings_map_sources() {
    let file = write_config(
        r#"
        [engine]
        sources = [{ chain = "arbitrum", dex = "camelot" }]
        "#,
    );
    let config = Config::load(file.path()).unwrap();
    let settings = config.engine_settings();
    assert_eq!(settings.sources.len(), 1);
    assert_eq!(settings.sources[0].0.as_str(), "arbitrum");
    assert_eq!(settings.sources[0].1.as_str(), "camelot");
}
