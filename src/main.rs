//! codeforge 命令行入口
//!
//! 需求来自命令行参数，未给出时交互式读取；运行流水线并把最终共享状态以 JSON 输出到 stdout。
//! 退出码：正常完成 0，Ctrl-C 取消 0，其余失败 1。

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use codeforge::config::{load_config, CONFIG_PATH_ENV};
use codeforge::{observability, Pipeline};

#[tokio::main]
async fn main() -> ExitCode {
    observability::init();

    tokio::select! {
        result = run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:?}");
                ExitCode::FAILURE
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            eprintln!("\nOperation cancelled by user.");
            // 交互读取位于阻塞线程中，运行时关闭会等待它结束，因此直接退出
            std::process::exit(0);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    let pipeline = Pipeline::from_config(&cfg).context("Failed to build pipeline")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let user_prompt = if args.is_empty() {
        tokio::task::spawn_blocking(read_prompt)
            .await
            .context("Prompt reader panicked")??
    } else {
        args.join(" ")
    };

    let state = pipeline.run(&user_prompt).await.context("Pipeline run failed")?;
    let json = serde_json::to_string_pretty(&state).context("Failed to serialize final state")?;
    println!("{json}");
    Ok(())
}

fn read_prompt() -> anyhow::Result<String> {
    print!("Enter your project prompt: ");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    let n = std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read prompt")?;
    if n == 0 {
        bail!("No prompt given (end of input)");
    }
    let prompt = line.trim().to_string();
    if prompt.is_empty() {
        bail!("Prompt must not be empty");
    }
    Ok(prompt)
}
