//! 命令行上传工具：选择一张本地图片，经网关去除背景后保存结果。
//!
//! 用法：
//!   bgremove [--gateway URL] [--token TOKEN] [--out DIR] [--json] <IMAGE>
//!
//! 未指定的参数取自 config.toml / 环境变量中的 `client` 配置。

use std::env;
use std::path::{Path, PathBuf};

use bg_remover::AppConfig;
use bg_remover::client::{DirectorySink, HttpGateway, SubmitOutcome, UploadController};
use bg_remover::config::ClientConfig;
use bg_remover::features::removal::UploadedFile;

const USAGE: &str = "用法: bgremove [--gateway URL] [--token TOKEN] [--out DIR] [--json] <IMAGE>";

#[derive(Debug, Default)]
struct Args {
    help: bool,
    json: bool,
    gateway: Option<String>,
    token: Option<String>,
    out_dir: Option<PathBuf>,
    image: Option<PathBuf>,
}

fn parse_args<I: Iterator<Item = String>>(mut it: I) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        let mut value_for = |flag: &str| it.next().ok_or_else(|| format!("{flag} 缺少参数值"));
        match arg.as_str() {
            "-h" | "--help" => args.help = true,
            "--json" => args.json = true,
            "--gateway" => args.gateway = Some(value_for("--gateway")?),
            "--token" => args.token = Some(value_for("--token")?),
            "--out" => args.out_dir = Some(PathBuf::from(value_for("--out")?)),
            other if other.starts_with('-') => return Err(format!("未知参数: {other}")),
            other => {
                if args.image.replace(PathBuf::from(other)).is_some() {
                    return Err("一次只能处理一张图片".to_string());
                }
            }
        }
    }
    Ok(args)
}

/// 按扩展名推断媒体类型（等价于浏览器文件选择器给出的 type）。
fn guess_media_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

fn client_config() -> ClientConfig {
    match AppConfig::load() {
        Ok(cfg) => cfg.client,
        Err(e) => {
            tracing::warn!("加载配置失败，使用默认客户端配置: {}", e);
            ClientConfig::default()
        }
    }
}

async fn run(args: Args) -> Result<(), String> {
    let image = args.image.ok_or_else(|| USAGE.to_string())?;
    let mut config = client_config();
    if let Some(url) = args.gateway {
        config.gateway_url = url;
    }
    let credential = args
        .token
        .or_else(|| config.default_service_token().map(str::to_string));

    let data = tokio::fs::read(&image)
        .await
        .map_err(|e| format!("读取 {} 失败: {e}", image.display()))?;
    let file = UploadedFile::new(
        image.file_name().map(|n| n.to_string_lossy().into_owned()),
        guess_media_type(&image).map(str::to_string),
        data,
    );

    let gateway = HttpGateway::from_config(&config).map_err(|e| e.to_string())?;
    eprintln!("上传 {} -> {}", image.display(), gateway.url());
    let controller = UploadController::new(gateway, credential);
    controller.select_file(file);

    match controller.submit().await {
        Ok(SubmitOutcome::Completed) => {}
        Ok(SubmitOutcome::Superseded) => return Err("请求已被取代".to_string()),
        Err(e) => return Err(e.to_string()),
    }

    let snapshot = controller.snapshot();
    if args.json {
        let text = serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("{}", snapshot.message);
    }

    let out_dir = args.out_dir.unwrap_or_else(|| PathBuf::from("."));
    let mut sink = DirectorySink::new(out_dir);
    controller.download(&mut sink).map_err(|e| e.to_string())?;
    if let Some(path) = sink.last_saved() {
        println!("已保存: {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bg_remover=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return;
    }

    if let Err(e) = run(args).await {
        eprintln!("错误: {e}");
        std::process::exit(1);
    }
}
