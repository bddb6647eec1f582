//! 协议 trace
//!
//! 每个 ARP、ICMP 帧和每次终点交付都记录为结构化的 [`TraceEvent`]。`Display`
//! 给出控制台上的时序图行，JSON 导出走 serde。

mod types;

pub use types::{FrameInfo, IpInfo, TraceEvent, TraceKind, TraceLog};
