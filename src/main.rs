use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use dsa_planner::commands::{
    self, AnalyzeInput, PlannerState, ProgressUpdateDto, ScheduleRequestDto, SheetInput,
};
use dsa_planner::config::PlannerConfig;
use dsa_planner::error::StoreError;
use dsa_planner::services::{Classifier, GroqClient, LogObserver};

/// 刷题计划生成器：题单表格分析、LLM 分类与按天学习计划
#[derive(Parser, Debug)]
#[command(name = "dsa-planner")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 数据库路径，覆盖配置
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 分析题单表格并分类
    Analyze {
        /// 本地表格文件（csv / tsv / xlsx / xls / ods）
        #[arg(long = "sheet")]
        sheets: Vec<PathBuf>,

        /// 公开表格链接，可写成 名称=URL
        #[arg(long = "url")]
        urls: Vec<String>,

        /// 题目 JSON 输出文件
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// 本次调用使用的分类密钥
        #[arg(long)]
        api_key: Option<String>,

        /// 跳过 LLM 分类
        #[arg(long)]
        no_classify: bool,
    },

    /// 根据题目 JSON 生成学习计划
    Schedule {
        /// 输入文件，包含 topicDays / topicOrder / problems / userId
        #[arg(short, long)]
        input: PathBuf,

        /// 用户 ID，覆盖输入文件中的 userId
        #[arg(short, long)]
        user: Option<String>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 显示当前学习计划
    Show {
        #[arg(short, long)]
        user: String,
    },

    /// 更新一道题的完成状态
    Progress {
        #[arg(short, long)]
        user: String,

        /// 第几天（从 0 开始）
        #[arg(long)]
        day_index: usize,

        /// 当天第几题（从 0 开始）
        #[arg(long)]
        problem_index: usize,

        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        completed: bool,
    },

    /// 进度统计
    Stats {
        #[arg(short, long)]
        user: String,
    },

    /// 历史计划
    History {
        #[arg(short, long)]
        user: String,
    },
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        std::env::var("PLANNER_LOG")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(LevelFilter::Info)
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .level_for("reqwest", LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()
        .context("初始化日志失败")?;

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PlannerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::from_env(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    Ok(config)
}

/// 有输出文件时写文件，否则打印到标准输出
fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("写入文件失败: {}", path.display()))?;
            log::info!("已写入 {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

async fn run(cli: Cli, state: PlannerState) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            sheets,
            urls,
            out,
            api_key,
            no_classify,
        } => {
            let input = AnalyzeInput {
                sheets: sheets
                    .into_iter()
                    .map(SheetInput::File)
                    .chain(urls.iter().map(|url| SheetInput::parse_url(url)))
                    .collect(),
                api_key,
            };

            let client = if no_classify {
                None
            } else {
                Some(GroqClient::new(&state.config, &state.topics)?)
            };
            let classifier = client.as_ref().map(|c| c as &dyn Classifier);

            let result = commands::analyze(&state, &input, classifier).await?;

            if out.is_some() {
                for topic in &result.summary {
                    println!(
                        "{:<40} easy {:>4}  medium {:>4}  hard {:>4}  total {:>5}",
                        topic.topic,
                        topic.easy,
                        topic.medium,
                        topic.hard,
                        topic.total()
                    );
                }
            }
            if result.partial {
                log::warn!(
                    "{} 个批次分类失败，对应题目保留原始主题和难度",
                    result.failed_batches.len()
                );
            }
            emit(&result, out.as_deref())
        }

        Commands::Schedule { input, user, out } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("读取输入失败: {}", input.display()))?;
            let mut request: ScheduleRequestDto = serde_json::from_str(&content)
                .with_context(|| format!("输入格式错误: {}", input.display()))?;
            if user.is_some() {
                request.user_id = user;
            }

            let response = commands::generate_schedule(&state, request);
            emit(&response, out.as_deref())
        }

        Commands::Show { user } => emit(&commands::show_schedule(&state, &user)?, None),

        Commands::Progress {
            user,
            day_index,
            problem_index,
            completed,
        } => {
            commands::update_progress(
                &state,
                &ProgressUpdateDto {
                    user_id: user,
                    day_index,
                    problem_index,
                    completed,
                },
            )?;
            println!("ok");
            Ok(())
        }

        Commands::Stats { user } => emit(&commands::get_progress_stats(&state, &user)?, None),

        Commands::History { user } => emit(&commands::get_schedule_history(&state, &user)?, None),
    }
}

async fn try_main(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let state = PlannerState::open(config, Arc::new(LogObserver))?;
    run(cli, state).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_logging(cli.verbose) {
        eprintln!("{:#}", err);
        return ExitCode::FAILURE;
    }

    match try_main(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{:#}", err);
            let not_found = err
                .downcast_ref::<StoreError>()
                .is_some_and(StoreError::is_not_found);
            if not_found {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
