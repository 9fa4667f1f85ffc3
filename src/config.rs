#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_FETCHER_PORT: u16 = 3000;
pub const DEFAULT_FETCHER_HOST: &str = "127.0.0.1";
pub const DEFAULT_OUTPUT_ROOT: &str = "downloads";
pub const DEFAULT_WORK_ROOT: &str = "temp";
pub const DEFAULT_WWW_ROOT: &str = "public";
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub output_root: PathBuf,
    pub work_root: PathBuf,
    pub www_root: PathBuf,
    pub host: String,
    pub port: u16,
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub audio_bitrate_kbps: u32,
    /// Only set when the file actually exists.
    pub cookies_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_root: Option<PathBuf>,
    pub work_root: Option<PathBuf>,
    pub www_root: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_config(overrides: ConfigOverrides) -> Result<ServiceConfig> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_config_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_config(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServiceConfig> {
    build_config_with_overrides(file_vars, env_lookup, ConfigOverrides::default())
}

fn build_config_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: ConfigOverrides,
) -> Result<ServiceConfig> {
    let path_value = |key: &str, explicit: Option<PathBuf>, default: &str| {
        explicit
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| lookup_value(key, file_vars, &env_lookup).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(default))
    };

    let output_root = path_value("OUTPUT_ROOT", overrides.output_root, DEFAULT_OUTPUT_ROOT);
    let work_root = path_value("WORK_ROOT", overrides.work_root, DEFAULT_WORK_ROOT);
    let www_root = path_value("WWW_ROOT", overrides.www_root, DEFAULT_WWW_ROOT);
    let yt_dlp = path_value("YT_DLP_PATH", None, "yt-dlp");
    let ffmpeg = path_value("FFMPEG_PATH", None, "ffmpeg");
    let ffprobe = path_value("FFPROBE_PATH", None, "ffprobe");

    let port = overrides
        .port
        .or_else(|| {
            lookup_value("FETCHER_PORT", file_vars, &env_lookup)
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_FETCHER_PORT);
    let host = overrides
        .host
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup_value("FETCHER_HOST", file_vars, &env_lookup))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FETCHER_HOST.to_string());

    let audio_bitrate_kbps = match lookup_value("AUDIO_BITRATE_KBPS", file_vars, &env_lookup) {
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or_else(|| anyhow!("AUDIO_BITRATE_KBPS must be a positive integer, got {raw:?}"))?,
        None => DEFAULT_AUDIO_BITRATE_KBPS,
    };

    let cookies_file = lookup_value("COOKIES_FILE", file_vars, &env_lookup)
        .map(PathBuf::from)
        .filter(|path| path.is_file());

    Ok(ServiceConfig {
        output_root,
        work_root,
        www_root,
        host,
        port,
        yt_dlp,
        ffmpeg,
        ffprobe,
        audio_bitrate_kbps,
        cookies_file,
    })
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| {
        file_vars
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    })
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
