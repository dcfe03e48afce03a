use std::io::Write;

pub(crate) const LOG_ENV: &str = "FRESHDEPS_LOG";
pub(crate) const LOG_STYLE_ENV: &str = "FRESHDEPS_LOG_STYLE";

/// Sends `log` records to stderr. Registry failures are logged at `warn`, so
/// they stay hidden unless `FRESHDEPS_LOG` asks for them.
pub(crate) fn init() {
    let env = env_logger::Env::new()
        .filter_or(LOG_ENV, "error")
        .write_style(LOG_STYLE_ENV);
    env_logger::Builder::from_env(env)
        .filter_module("hyper_util", log::LevelFilter::Warn)
        .filter_module("rustls", log::LevelFilter::Off)
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}",
                record.level().as_str().to_lowercase(),
                record.args()
            )
        })
        .init();
}
