//! 日志初始化：控制台输出到 stderr，可选写入日志文件。

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::LogSettings;

fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "ktimer", "ktimer").map_or_else(
        || {
            let current_dir = PathBuf::from(".");
            eprintln!("无法获取项目日志目录，将在当前目录写入日志: {current_dir:?}");
            current_dir
        },
        |dirs| dirs.data_local_dir().to_path_buf(),
    )
}

fn filter_or(directives: &str, fallback: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|e| {
        eprintln!("无效的日志过滤规则 {directives:?}: {e}，改用 {fallback}");
        EnvFilter::new(fallback)
    })
}

/// 安装全局日志订阅者。
///
/// 设置了 `RUST_LOG` 时控制台使用它，否则使用设置中的级别。
/// 返回的 guard 必须在程序退出前一直持有，否则文件日志会丢失。
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter_or(&settings.console_log_level, "warn"));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, guard) = if settings.enable_file_log {
        let appender = tracing_appender::rolling::never(log_dir(), "ktimer.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter_or(&settings.file_log_level, "info"));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("日志系统已经被初始化过了: {e}");
    }
    guard
}
