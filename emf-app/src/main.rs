use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use emf_config::{AppConfig, BackgroundMode, ConfigError};
use emf_frontend::ConvertOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 把 EMF 图元文件转换为 PNG 或 SVG。
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// 输入的 EMF 文件
    #[arg(short = 'i', long = "in", value_name = "PATH")]
    input: PathBuf,

    /// 输出文件，格式由扩展名决定
    #[arg(short = 'o', long = "out", value_name = "PATH", default_value = "./out.png")]
    output: PathBuf,

    /// 输出全部 trace 日志
    #[arg(long)]
    debug: bool,

    /// 显式指定配置文件
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 覆盖渲染倍率
    #[arg(long)]
    scale: Option<f64>,

    /// 使用透明背景
    #[arg(long)]
    transparent: bool,

    /// 只打印头部、记录统计与诊断
    #[arg(long)]
    info: bool,
}

fn main() {
    let cli = Cli::parse();
    let loaded = load_configuration(cli.config.clone());
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    if cli.debug {
        config.logging.level = "trace".to_string();
    }
    if cli.transparent {
        config.render.background = BackgroundMode::Transparent;
    }
    if let Some(scale) = cli.scale {
        config.render.scale = scale;
    }
    init_logging(&config);
    if let Err(err) = &loaded {
        report_config_error(err);
    }

    if let Err(err) = run(&cli, &config) {
        error!(error = %err, "执行失败");
        eprintln!("错误: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    if cli.info {
        let loaded = emf_frontend::loader::load_metafile(&cli.input)
            .with_context(|| format!("无法读取 {}", cli.input.display()))?;
        print!("{}", emf_frontend::summary::describe(&loaded.outcome));
        return Ok(());
    }

    let options = ConvertOptions::from_config(config);
    info!(input = %cli.input.display(), output = %cli.output.display(), "开始转换");
    let report = emf_frontend::convert(&cli.input, &cli.output, &options).with_context(|| {
        format!(
            "转换 {} 到 {} 失败",
            cli.input.display(),
            cli.output.display()
        )
    })?;
    for skipped in &report.skipped {
        warn!(
            index = skipped.index,
            record_type = skipped.record_type,
            reason = %skipped.reason,
            "记录被跳过"
        );
    }
    println!(
        "已写出 {} ({}x{}, 跳过 {} 条记录)",
        cli.output.display(),
        report.width,
        report.height,
        report.skipped.len()
    );
    Ok(())
}

/// 显式路径优先，否则走自动发现。失败时由调用方回退到默认配置。
fn load_configuration(override_path: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    }
}

fn report_config_error(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
