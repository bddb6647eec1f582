use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::{Packet, PacketKind};

/// 帧的链路层信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub src_name: String,
    pub dst_name: String,
    pub src_hw: String,
    pub dst_hw: String,
}

/// 帧的 IP/ICMP 层信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpInfo {
    pub src_ip: String,
    pub dst_ip: String,
    pub ttl: u8,
    pub mf: bool,
    pub off: usize,
    /// echo 载荷；time exceeded 没有
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// trace 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceKind {
    /// 广播“谁有 `target`？告诉 `sender`”
    ArpRequest {
        frame: FrameInfo,
        target: String,
        sender: String,
    },
    /// “`ip` 在 `frame.src_hw`”
    ArpReply { frame: FrameInfo, ip: String },
    EchoRequest { frame: FrameInfo, ip: IpInfo },
    EchoReply { frame: FrameInfo, ip: IpInfo },
    TimeExceeded { frame: FrameInfo, ip: IpInfo },
    /// echo request 载荷交付给目的节点
    Delivered { node: String, payload: String },
    /// echo reply 回到原发送方
    ReplyReceived { node: String, payload: String },
    /// time exceeded 通知到达节点
    TimeExceededReceived { node: String, reporter: String },
    /// 帧被丢弃，不再产生任何数据包
    Discarded { at: String, reason: String },
}

impl TraceKind {
    /// 链路上一帧对应的 trace 记录
    pub fn from_packet(pkt: &Packet) -> Self {
        let frame = FrameInfo {
            src_name: pkt.src.name.clone(),
            dst_name: pkt.dst.name.clone(),
            src_hw: pkt.src.hw.to_string(),
            dst_hw: pkt.dst.hw.to_string(),
        };
        let ip = |data: Option<String>| IpInfo {
            src_ip: pkt.src.address.ip().to_string(),
            dst_ip: pkt.dst.address.ip().to_string(),
            ttl: pkt.ttl,
            mf: pkt.more_fragments,
            off: pkt.offset,
            data,
        };
        match pkt.kind {
            PacketKind::ArpRequest => TraceKind::ArpRequest {
                frame,
                target: pkt.dst.address.ip().to_string(),
                sender: pkt.src.address.ip().to_string(),
            },
            PacketKind::ArpReply => TraceKind::ArpReply {
                frame,
                ip: pkt.src.address.ip().to_string(),
            },
            PacketKind::EchoRequest => TraceKind::EchoRequest {
                frame,
                ip: ip(Some(pkt.payload.clone())),
            },
            PacketKind::EchoReply => TraceKind::EchoReply {
                frame,
                ip: ip(Some(pkt.payload.clone())),
            },
            PacketKind::TimeExceeded => TraceKind::TimeExceeded {
                frame,
                ip: ip(None),
            },
        }
    }

    pub fn is_arp(&self) -> bool {
        matches!(self, TraceKind::ArpRequest { .. } | TraceKind::ArpReply { .. })
    }
}

fn write_ip(f: &mut fmt::Formatter<'_>, frame: &FrameInfo, ip: &IpInfo) -> fmt::Result {
    write!(
        f,
        "{} => {} : ETH (src={} dst={}) \\n IP (src={} dst={} ttl={} mf={} off={}) \\n ",
        frame.src_name,
        frame.dst_name,
        frame.src_hw,
        frame.dst_hw,
        ip.src_ip,
        ip.dst_ip,
        ip.ttl,
        u8::from(ip.mf),
        ip.off,
    )
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceKind::ArpRequest {
                frame,
                target,
                sender,
            } => write!(
                f,
                "{} box {} : ETH (src={} dst={}) \\n ARP - Who has {}? Tell {};",
                frame.src_name, frame.src_name, frame.src_hw, frame.dst_hw, target, sender
            ),
            TraceKind::ArpReply { frame, ip } => write!(
                f,
                "{} => {} : ETH (src={} dst={}) \\n ARP - {} is at {};",
                frame.src_name, frame.dst_name, frame.src_hw, frame.dst_hw, ip, frame.src_hw
            ),
            TraceKind::EchoRequest { frame, ip } => {
                write_ip(f, frame, ip)?;
                write!(
                    f,
                    "ICMP - Echo request (data={});",
                    ip.data.as_deref().unwrap_or_default()
                )
            }
            TraceKind::EchoReply { frame, ip } => {
                write_ip(f, frame, ip)?;
                write!(
                    f,
                    "ICMP - Echo reply (data={});",
                    ip.data.as_deref().unwrap_or_default()
                )
            }
            TraceKind::TimeExceeded { frame, ip } => {
                write_ip(f, frame, ip)?;
                write!(f, "ICMP - Time Exceeded;")
            }
            TraceKind::Delivered { node, payload } => {
                write!(f, "{node} rbox {node} : Received {payload};")
            }
            TraceKind::ReplyReceived { node, payload } => {
                write!(f, "{node} rbox {node} : Reply received (data={payload});")
            }
            TraceKind::TimeExceededReceived { node, reporter } => {
                write!(f, "{node} rbox {node} : Time exceeded reported by {reporter};")
            }
            TraceKind::Discarded { at, reason } => {
                write!(f, "{at} rbox {at} : Discarded ({reason});")
            }
        }
    }
}

/// 一条记录的事件，按产生顺序编号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub kind: TraceKind,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

/// 一个简单的事件收集器（存内存，运行结束后打印或写 JSON 文件）
#[derive(Debug, Default, Clone)]
pub struct TraceLog {
    events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, kind: TraceKind) -> &TraceEvent {
        let seq = self.events.len() as u64;
        self.events.push(TraceEvent { seq, kind });
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, pred: impl Fn(&TraceKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    /// 按顺序渲染出的协议行
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.events.iter().map(|e| e.to_string())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
