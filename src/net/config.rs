//! 仿真配置

/// 路由器转发 echo reply 时使用的 MTU；下一跳会按自己的出口 MTU 重新切分。
pub const REPLY_SENTINEL_MTU: usize = usize::MAX;

/// 整次运行的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// 新生成的 echo request、echo reply 和 time exceeded 包使用的 TTL
    pub initial_ttl: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { initial_ttl: 8 }
    }
}
