//! 错误类型
//!
//! 地址模型、拓扑构建和消息分发共用的错误分类。TTL 耗尽和 ARP 缓存未命中是协议
//! 结果而不是错误，不会出现在这里。

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::net::Address;

/// 地址字面量格式错误（`a.b.c.d` 或 `a.b.c.d/prefix`）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address `{literal}`: {reason}")]
pub struct AddressFormatError {
    pub literal: String,
    pub reason: &'static str,
}

impl AddressFormatError {
    pub(crate) fn new(literal: &str, reason: &'static str) -> Self {
        Self {
            literal: literal.to_string(),
            reason,
        }
    }
}

/// 以小于 1 的 MTU 请求分片
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("mtu must be at least 1, got {mtu}")]
pub struct InvalidMtuError {
    pub mtu: usize,
}

/// 出错行所在的拓扑描述块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Node,
    Router,
    RouterTable,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Node => write!(f, "#NODE"),
            Section::Router => write!(f, "#ROUTER"),
            Section::RouterTable => write!(f, "#ROUTERTABLE"),
        }
    }
}

/// 格式错误或前后矛盾的拓扑行
///
/// `index` 是该行在所属块内的下标（从 0 开始）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{section} line {index}: {reason}")]
pub struct TopologyFormatError {
    pub section: Section,
    pub index: usize,
    pub reason: String,
    #[source]
    pub source: Option<AddressFormatError>,
}

impl TopologyFormatError {
    pub(crate) fn new(section: Section, index: usize, reason: impl Into<String>) -> Self {
        Self {
            section,
            index,
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn address(section: Section, index: usize, err: AddressFormatError) -> Self {
        Self {
            section,
            index,
            reason: err.to_string(),
            source: Some(err),
        }
    }
}

/// 不属于任何组件的名字、地址或硬件地址
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown endpoint `{endpoint}`")]
pub struct UnknownEndpointError {
    pub endpoint: String,
}

impl UnknownEndpointError {
    pub(crate) fn new(endpoint: impl fmt::Display) -> Self {
        Self {
            endpoint: endpoint.to_string(),
        }
    }
}

/// `from` 无法到达 `destination`：没有路由表项覆盖它，或没有默认网关的节点试图
/// 离开本子网。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{from} has no route to {destination}")]
pub struct NoRouteError {
    pub from: String,
    pub destination: Address,
}

/// 使 `send_message` 中止的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    UnknownEndpoint(#[from] UnknownEndpointError),
    #[error(transparent)]
    NoRoute(#[from] NoRouteError),
    #[error(transparent)]
    InvalidMtu(#[from] InvalidMtuError),
}

/// 拓扑文件转成 `Topology` 失败
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("topology has no {0} section")]
    MissingSection(Section),
    #[error(transparent)]
    Format(#[from] TopologyFormatError),
}
