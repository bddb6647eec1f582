//! 数据包模型
//!
//! 数据包是值对象：每一跳都构造新的包，不修改收到的包。一条逻辑消息以非空的
//! [`Fragments`] 集合传输，并在每个出口按 MTU 重新切分。

use std::fmt;

use super::address::Address;
use super::id::HwAddr;
use crate::error::InvalidMtuError;

/// 当前这一跳的收发端
///
/// `name` 和 `hw` 逐跳改变；`address` 端到端保持不变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub hw: HwAddr,
    pub address: Address,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, hw: HwAddr, address: Address) -> Self {
        Self {
            name: name.into(),
            hw,
            address,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    ArpRequest,
    ArpReply,
    EchoRequest,
    EchoReply,
    TimeExceeded,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PacketKind::ArpRequest => "arp-request",
            PacketKind::ArpReply => "arp-reply",
            PacketKind::EchoRequest => "echo-request",
            PacketKind::EchoReply => "echo-reply",
            PacketKind::TimeExceeded => "time-exceeded",
        };
        f.write_str(s)
    }
}

/// 一条链路上的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketKind,
    pub src: Endpoint,
    pub dst: Endpoint,
    pub payload: String,
    pub ttl: u8,
    /// 后面还有分片
    pub more_fragments: bool,
    /// `payload` 在逻辑消息中的字符位置
    pub offset: usize,
}

impl Packet {
    /// 创建完整（未分片）的数据包
    pub fn new(
        kind: PacketKind,
        src: Endpoint,
        dst: Endpoint,
        payload: impl Into<String>,
        ttl: u8,
    ) -> Self {
        Self {
            kind,
            src,
            dst,
            payload: payload.into(),
            ttl,
            more_fragments: false,
            offset: 0,
        }
    }

    /// 按最多 `mtu` 个字符切分载荷
    pub fn fragment(&self, mtu: usize) -> Result<Fragments, InvalidMtuError> {
        fragment(self, mtu)
    }
}

/// 将 `packet.payload` 切成 `mtu` 大小的分片。
///
/// 每个分片继承类型、地址和 ttl；`offset` 为 `mtu * index`，除最后一片外都置
/// `more_fragments`。空载荷或短载荷只产生一个分片。
pub fn fragment(packet: &Packet, mtu: usize) -> Result<Fragments, InvalidMtuError> {
    if mtu == 0 {
        return Err(InvalidMtuError { mtu });
    }

    let chars: Vec<char> = packet.payload.chars().collect();
    if chars.len() <= mtu {
        return Ok(Fragments(vec![Packet {
            more_fragments: false,
            offset: 0,
            ..packet.clone()
        }]));
    }

    let chunks: Vec<&[char]> = chars.chunks(mtu).collect();
    let last = chunks.len() - 1;
    let pieces = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| Packet {
            kind: packet.kind,
            src: packet.src.clone(),
            dst: packet.dst.clone(),
            payload: chunk.iter().collect(),
            ttl: packet.ttl,
            more_fragments: i != last,
            offset: mtu * i,
        })
        .collect();
    Ok(Fragments(pieces))
}

/// 按给定顺序重组分片。
///
/// 地址、类型和 ttl 取自第一片；同一消息的分片在构造时就一致。空切片返回 `None`。
pub fn reassemble(fragments: &[Packet]) -> Option<Packet> {
    fragments.first().map(|first| join(first, fragments))
}

fn join(first: &Packet, fragments: &[Packet]) -> Packet {
    Packet {
        payload: fragments.iter().map(|p| p.payload.as_str()).collect(),
        more_fragments: false,
        offset: 0,
        ..first.clone()
    }
}

/// 所有分片的 ttl 都为 0
pub fn all_ttl_expired(fragments: &[Packet]) -> bool {
    fragments.iter().all(|p| p.ttl == 0)
}

/// 一条逻辑消息的非空有序分片集合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragments(Vec<Packet>);

impl Fragments {
    /// 包装已切好的分片列表；为空时返回 `None`
    pub fn from_packets(packets: Vec<Packet>) -> Option<Self> {
        if packets.is_empty() {
            None
        } else {
            Some(Self(packets))
        }
    }

    pub fn head(&self) -> &Packet {
        &self.0[0]
    }

    pub fn kind(&self) -> PacketKind {
        self.head().kind
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Packet> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Packet] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Packet> {
        self.0
    }

    pub fn reassemble(&self) -> Packet {
        join(self.head(), &self.0)
    }

    pub fn all_ttl_expired(&self) -> bool {
        all_ttl_expired(&self.0)
    }

    /// 不重组，直接把每个分片再切到 `mtu`。
    /// 偏移量仍相对于整条消息。
    pub fn refragment(&self, mtu: usize) -> Result<Fragments, InvalidMtuError> {
        let mut out = Vec::with_capacity(self.0.len());
        for frag in &self.0 {
            let pieces = fragment(frag, mtu)?.into_vec();
            let n = pieces.len();
            for (j, mut piece) in pieces.into_iter().enumerate() {
                piece.offset += frag.offset;
                piece.more_fragments = j + 1 < n || frag.more_fragments;
                out.push(piece);
            }
        }
        Ok(Fragments(out))
    }
}

impl<'a> IntoIterator for &'a Fragments {
    type Item = &'a Packet;
    type IntoIter = std::slice::Iter<'a, Packet>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
