use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ktimer::{
    OutputFormat,
    converter::{
        generators::ass_generator::generate_timings,
        parsers::ass_parser::strip_script_header,
        processors::text_normalizer::{prepare_for_syllablize, strip_cr},
    },
    layout::Layout,
    logger::init_logging,
    replay::{ScriptedHost, parse_script, run_script},
    settings::AppSettings,
    timing::TimingSession,
};

/// 逐音节卡拉OK打轴工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 使用指定的配置文件，而不是默认位置的配置
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 预处理并自动分音节，输出结果
    Syllablize {
        file: PathBuf,
        /// 分音节等级，默认取配置中的值
        #[arg(short, long)]
        level: Option<u8>,
    },

    /// 移除 ASS 文件的头部，只保留事件行
    Strip { file: PathBuf },

    /// 载入歌词并按脚本回放按键，输出打轴结果
    Replay {
        /// 歌词文件，扩展名为 .ass 时会先移除头部
        layout: PathBuf,
        /// 按键脚本
        script: PathBuf,
        #[arg(short, long)]
        format: Option<OutputFormat>,
        #[arg(long)]
        style: Option<String>,
        /// 导出时的时间偏移（秒）
        #[arg(long, allow_hyphen_values = true)]
        shift: Option<f64>,
    },
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("无法读取文件 {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = cli
        .config
        .as_deref()
        .map_or_else(AppSettings::load, AppSettings::load_from);
    let _log_guard = init_logging(&settings.log_settings);
    tracing::debug!("[ktimer] 使用设置: {settings:?}");

    match cli.command {
        Commands::Syllablize { file, level } => {
            let level = level.unwrap_or(settings.timer.syllablize_level);
            print!("{}", prepare_for_syllablize(&read_text(&file)?, level));
        }
        Commands::Strip { file } => {
            print!("{}", strip_script_header(&strip_cr(&read_text(&file)?)));
        }
        Commands::Replay {
            layout,
            script,
            format,
            style,
            shift,
        } => {
            let mut options = settings.timer;
            if let Some(format) = format {
                options.output_format = format;
            }
            if let Some(style) = style {
                options.style = style;
            }
            if let Some(shift) = shift {
                options.time_shift = shift;
            }

            let is_ass = layout
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ass"));
            let document = Layout::load_file_text(&read_text(&layout)?, is_ass)
                .with_context(|| format!("无法载入歌词 {}", layout.display()))?;
            let steps = parse_script(&read_text(&script)?)?;

            let mut session = TimingSession::new(document, options);
            let mut host = ScriptedHost::default();
            for (line_number, e) in run_script(&mut session, &mut host, &steps) {
                eprintln!("脚本第 {line_number} 行被拒绝: {e}");
            }

            let output = generate_timings(session.layout(), session.options())?;
            println!("{output}");
        }
    }

    Ok(())
}
