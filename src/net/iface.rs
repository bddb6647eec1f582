//! 网络接口与路由器端口

use super::address::Address;
use super::id::HwAddr;

/// 一个接入点的地址、硬件地址和 MTU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub address: Address,
    pub hw: HwAddr,
    /// 该链路上单帧可携带的最大载荷（字符数）
    pub mtu: usize,
}

impl NetworkInterface {
    pub fn new(address: Address, hw: HwAddr, mtu: usize) -> Self {
        Self { address, hw, mtu }
    }
}

/// 带编号的路由器端口
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub number: usize,
    pub iface: NetworkInterface,
}

impl Port {
    pub fn new(number: usize, iface: NetworkInterface) -> Self {
        Self { number, iface }
    }
}
