//! 拓扑描述文件
//!
//! 按行解析，不区分大小写。`#NODE`、`#ROUTER` 和 `#ROUTERTABLE` 开启一个块，直到
//! 下一个含 `#` 的行为止；块内其余每行是一条逗号分隔的记录。

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use super::build::build_topology_with_config;
use crate::error::{LoadError, Section, TopologyFormatError};
use crate::net::{SimConfig, Topology};

const NODE_MARKER: &str = "#NODE";
const ROUTER_MARKER: &str = "#ROUTER";
const ROUTER_TABLE_MARKER: &str = "#ROUTERTABLE";

/// 描述文件分好字段（转大写、按逗号切分）后的记录
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TopologyFile {
    pub nodes: Vec<Vec<String>>,
    pub routers: Vec<Vec<String>>,
    pub routes: Vec<Vec<String>>,
    /// 出现过的标记
    pub seen: Vec<Section>,
}

impl TopologyFile {
    pub fn build(&self) -> Result<Topology, TopologyFormatError> {
        self.build_with_config(SimConfig::default())
    }

    pub fn build_with_config(&self, config: SimConfig) -> Result<Topology, TopologyFormatError> {
        build_topology_with_config(&self.nodes, &self.routers, &self.routes, config)
    }
}

/// 把描述切成三个记录块。跳过空行，忽略未知 `#` 标记下的行。
pub fn parse_topology(text: &str) -> TopologyFile {
    let mut file = TopologyFile::default();
    let mut current: Option<Section> = None;

    for raw in text.lines() {
        let line = raw.trim().to_ascii_uppercase();
        if line.is_empty() {
            continue;
        }
        if line.contains('#') {
            current = match line.as_str() {
                NODE_MARKER => Some(Section::Node),
                ROUTER_MARKER => Some(Section::Router),
                ROUTER_TABLE_MARKER => Some(Section::RouterTable),
                _ => {
                    warn!(line = %line, "⚠️  忽略未知段");
                    None
                }
            };
            if let Some(section) = current {
                if !file.seen.contains(&section) {
                    file.seen.push(section);
                }
            }
            continue;
        }

        let record: Vec<String> = line.split(',').map(|f| f.trim().to_string()).collect();
        match current {
            Some(Section::Node) => file.nodes.push(record),
            Some(Section::Router) => file.routers.push(record),
            Some(Section::RouterTable) => file.routes.push(record),
            None => debug!(line = %line, "跳过不属于任何段的行"),
        }
    }

    file
}

/// 读取并切分描述文件；没有 `#NODE` 块的文件被拒绝
pub fn read_topology(path: impl AsRef<Path>) -> Result<TopologyFile, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_topology(&text);
    if !file.seen.contains(&Section::Node) {
        return Err(LoadError::MissingSection(Section::Node));
    }
    debug!(
        path = %path.display(),
        nodes = file.nodes.len(),
        routers = file.routers.len(),
        routes = file.routes.len(),
        "📄 已读取拓扑文件"
    );
    Ok(file)
}

/// 先 [`read_topology`]，再用 `config` 构建
pub fn load_topology(path: impl AsRef<Path>, config: SimConfig) -> Result<Topology, LoadError> {
    Ok(read_topology(path)?.build_with_config(config)?)
}
