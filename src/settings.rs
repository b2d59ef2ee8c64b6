use directories::ProjectDirs;
use ktimer_core::TimerOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub enable_file_log: bool,
    /// `EnvFilter` 语法的过滤规则，例如 `info` 或 `ktimer=debug`。
    pub file_log_level: String,
    pub console_log_level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enable_file_log: false,
            file_log_level: "info".to_string(),
            console_log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub log_settings: LogSettings,
    pub timer: TimerOptions,
}

impl AppSettings {
    pub fn config_dir() -> Option<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "ktimer", "ktimer") {
            let config_dir = proj_dirs.config_dir();
            if !config_dir.exists()
                && let Err(e) = fs::create_dir_all(config_dir)
            {
                tracing::error!("无法创建配置目录 {config_dir:?}: {e}");
                return None;
            }
            Some(config_dir.to_path_buf())
        } else {
            tracing::error!("无法获取项目配置目录路径。");
            None
        }
    }

    pub fn config_file_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("ktimer.toml"))
    }

    /// 从默认位置加载设置。文件不存在时写入一份默认设置。
    pub fn load() -> Self {
        match Self::config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// 从指定文件加载设置，任何错误都会退回默认设置。
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            tracing::info!("[Settings] 尝试从 {path:?} 加载配置文件。");
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => {
                        tracing::error!(
                            "[Settings] 解析配置文件 {path:?} 失败: {e}。将使用默认配置。"
                        );
                        return Self::default();
                    }
                },
                Err(e) => {
                    tracing::error!("[Settings] 读取配置文件 {path:?} 失败: {e}。将使用默认配置。");
                    return Self::default();
                }
            }
        }

        tracing::info!("[Settings] 配置文件 {path:?} 未找到。将创建并使用默认配置。");
        let default_settings = Self::default();
        if let Err(e) = default_settings.save_to(path) {
            tracing::error!("[Settings] 无法保存初始默认配置文件: {e}");
        }
        default_settings
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(path) = Self::config_file_path() {
            self.save_to(&path)
        } else {
            let err_msg = "[Settings] 无法确定配置文件路径，保存失败。";
            tracing::error!("{err_msg}");
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, err_msg))
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        match toml::to_string_pretty(self) {
            Ok(content) => {
                fs::write(path, content)?;
                tracing::info!("[Settings] 设置已成功保存到 {path:?}");
                Ok(())
            }
            Err(e) => {
                tracing::error!("[Settings] 序列化设置失败: {e}");
                Err(std::io::Error::other(e))
            }
        }
    }
}
