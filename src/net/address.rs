//! 地址模型
//!
//! IPv4 地址加前缀长度，以及所有转发决策依赖的按位子网判断。

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::AddressFormatError;

/// IPv4 地址 + 前缀长度（0..=32）
///
/// 派生的 `PartialEq` 是“完整匹配”（地址和前缀都相等）；需要忽略前缀时用
/// [`Address::same_numeric`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    ip: Ipv4Addr,
    prefix: u8,
}

impl Address {
    /// `0.0.0.0/0`：下一跳为此值表示“直接在本端口所在网段投递”
    pub const ON_LINK: Self = Self {
        ip: Ipv4Addr::UNSPECIFIED,
        prefix: 0,
    };

    pub fn new(ip: Ipv4Addr, prefix: u8) -> Result<Self, AddressFormatError> {
        if prefix > 32 {
            return Err(AddressFormatError::new(
                &format!("{ip}/{prefix}"),
                "prefix length must be 0..=32",
            ));
        }
        Ok(Self { ip, prefix })
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// 四个八位组按高位在前打包成 u32
    pub fn to_numeric(&self) -> u32 {
        u32::from(self.ip)
    }

    /// 前 `prefix` 位为 1 的掩码；前缀为 0 时掩码全 0。
    pub fn mask(&self) -> u32 {
        u32::MAX
            .checked_shl(32 - u32::from(self.prefix))
            .unwrap_or(0)
    }

    /// 所在网络的网络地址
    pub fn network(&self) -> u32 {
        self.to_numeric() & self.mask()
    }

    /// 所在网络的广播地址
    pub fn broadcast(&self) -> u32 {
        self.network() | !self.mask()
    }

    /// `other` 是否落在 `self` 所在网络内。
    ///
    /// 只使用 `self` 的前缀，所以关系不对称：从持有 `self` 的一方来判断。
    pub fn is_same_network(&self, other: &Address) -> bool {
        let n = other.to_numeric();
        (self.network()..=self.broadcast()).contains(&n)
    }

    /// 只比较数值，忽略前缀
    pub fn same_numeric(&self, other: &Address) -> bool {
        self.ip == other.ip
    }

    pub fn is_on_link(&self) -> bool {
        *self == Self::ON_LINK
    }

    /// 任意前缀的 `0.0.0.0`
    pub fn is_unspecified(&self) -> bool {
        self.ip.is_unspecified()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ip, self.prefix)
    }
}

fn parse_decimal(part: &str, max: u32) -> Option<u32> {
    if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse::<u32>().ok().filter(|v| *v <= max)
}

impl FromStr for Address {
    type Err = AddressFormatError;

    /// 接受 `a.b.c.d`（前缀为 0）或 `a.b.c.d/p`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (ip, prefix) = match s.split_once('/') {
            Some((ip, prefix)) => {
                let prefix = parse_decimal(prefix, 32)
                    .ok_or_else(|| AddressFormatError::new(s, "prefix length must be 0..=32"))?;
                (ip, prefix as u8)
            }
            None => (s, 0),
        };

        let parts: Vec<&str> = ip.split('.').collect();
        if parts.len() != 4 {
            return Err(AddressFormatError::new(s, "expected exactly four octets"));
        }
        let mut octets = [0u8; 4];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = parse_decimal(part, 255)
                .ok_or_else(|| AddressFormatError::new(s, "octet must be a decimal 0..=255"))?
                as u8;
        }

        Ok(Self {
            ip: Ipv4Addr::from(octets),
            prefix,
        })
    }
}
