//! Kagami CLI - コマンドラインインターフェース
//!
//! 観測対象プロセスにアタッチし、ミラーの状態を周期的に表示する
//! デモドライバ。静的アドレスはパターンスキャナの代わりにフラグで
//! 与えます。

use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use kagami_layout::{Addr, ForeignRead};
use kagami_mirror::context::{AREA_CHANGE_KEY, FILE_ROOT_KEY, STATES_KEY};
use kagami_mirror::counter::EMPTY_COUNTER;
use kagami_mirror::Context;
use kagami_sched::Scheduler;
use kagami_target::Memory;

/// Kagami - foreign process state mirror
#[derive(Parser)]
#[command(name = "kagami")]
#[command(version = "0.1.0")]
#[command(about = "Mirrors typed state out of a running foreign process", long_about = None)]
struct Cli {
    /// Process ID to observe
    #[arg(short, long)]
    pid: i32,

    /// Address of the game states static object
    #[arg(long, value_parser = parse_address)]
    states: u64,

    /// Address of the file table root
    #[arg(long, value_parser = parse_address)]
    files: u64,

    /// Address of the area change counter
    #[arg(long, value_parser = parse_address)]
    area_counter: u64,

    /// Scheduler tick interval in milliseconds
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
}

/// アドレス文字列をパースする（"0x" 付き 16 進または 10 進）
fn parse_address(input: &str) -> Result<u64, String> {
    let parsed = if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else {
        input.parse()
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", input, e))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let interval = Duration::from_millis(cli.interval_ms);

    let memory = Rc::new(Memory::new(cli.pid));
    let sched = Rc::new(Scheduler::new());
    let ctx = Context::new(Rc::clone(&sched), Rc::clone(&memory) as Rc<dyn ForeignRead>);

    ctx.set_static_address(STATES_KEY, Addr(cli.states));
    ctx.set_static_address(FILE_ROOT_KEY, Addr(cli.files));
    ctx.set_static_address(AREA_CHANGE_KEY, Addr(cli.area_counter));
    ctx.initialize();
    ctx.on_attached();

    println!("kagami: mirroring pid {}", cli.pid);

    loop {
        std::thread::sleep(interval);
        sched.advance(interval);

        if !memory.is_alive() {
            ctx.on_closed();
            println!("kagami: foreign process exited");
            return Ok(());
        }

        print_status(&ctx);
    }
}

/// ミラーの現在値を 1 行で表示する
fn print_status(ctx: &Context) {
    let states = ctx.states.borrow();
    let counter = ctx.area_counter.borrow();
    let area = if counter.value() == EMPTY_COUNTER {
        "-".to_string()
    } else {
        counter.value().to_string()
    };
    println!(
        "state={:?} known_states={} area_changes={} files={}",
        states.current_kind(),
        states.all_states().len(),
        area,
        ctx.files.borrow().count(),
    );
}
