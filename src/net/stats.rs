//! 统计信息
//!
//! 一次仿真运行收集的计数。

/// 单次运行的计数。IP 层类型按帧（分片）计数，终点事件按逻辑消息计数。
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub arp_requests: u64,
    pub arp_replies: u64,
    pub echo_requests: u64,
    pub echo_replies: u64,
    pub time_exceeded: u64,
    pub delivered_msgs: u64,
    pub replies_received: u64,
    pub time_exceeded_received: u64,
    pub discarded: u64,
}
