//! 拓扑加载
//!
//! 把拓扑描述（文件或已分好字段的行）转成校验过的 [`crate::net::Topology`]。

mod build;
mod file;

pub use build::{build_topology, build_topology_with_config};
pub use file::{TopologyFile, load_topology, parse_topology, read_topology};
