//! Ping 仿真
//!
//! 加载拓扑描述文件，从源节点向目的节点发送一条消息，并打印协议 trace

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use netsim_rs::error::{DeliveryError, LoadError};
use netsim_rs::net::SimConfig;
use netsim_rs::topo::load_topology;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "netsim", about = "静态拓扑中的 ping 仿真：ARP、路由、分片、TTL")]
struct Args {
    /// 拓扑描述文件
    topology: PathBuf,
    /// 源节点名
    src: String,
    /// 目的节点名
    dst: String,
    /// echo request 携带的消息
    message: String,
    /// 新生成数据包的 TTL
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u8).range(1..))]
    ttl: u8,
    /// 将 trace 以 JSON 数组写入该文件
    #[arg(long)]
    trace_json: Option<PathBuf>,
    /// 运行结束后打印统计
    #[arg(long)]
    stats: bool,
}

fn load_exit_code(err: &LoadError) -> ExitCode {
    match err {
        LoadError::Io { .. } => ExitCode::from(1),
        LoadError::MissingSection(_) | LoadError::Format(_) => ExitCode::from(2),
    }
}

fn delivery_exit_code(err: &DeliveryError) -> ExitCode {
    match err {
        DeliveryError::UnknownEndpoint(_) => ExitCode::from(3),
        DeliveryError::NoRoute(_) => ExitCode::from(4),
        DeliveryError::InvalidMtu(_) => ExitCode::from(5),
    }
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = SimConfig {
        initial_ttl: args.ttl,
    };

    let mut topo = match load_topology(&args.topology, config) {
        Ok(topo) => topo,
        Err(err) => {
            error!(%err, "加载拓扑失败");
            eprintln!("error: {err}");
            return load_exit_code(&err);
        }
    };
    info!(src = %args.src, dst = %args.dst, "🚀 开始仿真");

    let result = topo.send_message_by_name(&args.message, &args.src, &args.dst);

    // 失败前的 trace 照样打印
    for line in topo.trace.lines() {
        println!("{line}");
    }

    if let Some(path) = &args.trace_json {
        let written = topo
            .trace
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(err) = written {
            error!(%err, path = %path.display(), "写入 trace JSON 失败");
            eprintln!("error: failed to write {}: {err}", path.display());
            return ExitCode::from(1);
        }
    }

    if args.stats {
        let s = &topo.stats;
        println!(
            "stats arp_requests={} arp_replies={} echo_requests={} echo_replies={} time_exceeded={} delivered={} replies={} discarded={}",
            s.arp_requests,
            s.arp_replies,
            s.echo_requests,
            s.echo_replies,
            s.time_exceeded,
            s.delivered_msgs,
            s.replies_received,
            s.discarded
        );
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "仿真中止");
            eprintln!("error: {err}");
            delivery_exit_code(&err)
        }
    }
}
