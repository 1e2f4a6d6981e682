//! Bit arithmetic and CIDR text helpers shared by the index and the engine.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::errors::Error;

/// Widen a prefix's network address into the 128-bit index key. IPv4
/// addresses occupy the low 32 bits (twelve zero bytes of left padding);
/// IPv6 addresses use the full width. The two families never share an
/// index, so the widening only has to preserve per-family ordering.
#[inline]
pub fn widened_key(net: &IpNet) -> u128 {
    match net.network() {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

#[inline]
pub fn mask128(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else if prefix_len >= 128 {
        !0u128
    } else {
        !(!0u128 >> prefix_len)
    }
}

/// Zero every bit of `key` below `prefix_len`.
#[inline(always)]
pub fn canonical(key: u128, prefix_len: u8) -> u128 {
    key & mask128(prefix_len)
}

#[inline]
pub fn get_bit(key: u128, index: u8) -> u8 {
    debug_assert!(index <= 127);
    ((key >> (127 - index)) & 1) as u8
}

pub fn common_prefix_len(key1: u128, key2: u128, max_len: u8) -> u8 {
    if max_len == 0 {
        return 0;
    }
    let diff = (key1 ^ key2) & mask128(max_len);
    if diff == 0 {
        return max_len;
    }
    (diff.leading_zeros() as u8).min(max_len)
}

/// Step `addr` by `2^(W - bit)`, where `W` is the family's address width.
/// The carry propagates toward the most significant octet; carrying out of
/// octet 0 wraps to the all-zeros address and reports it. `bit == 0` is a
/// step of the entire address space and wraps immediately.
pub fn increment_at_bit(addr: IpAddr, bit: u8) -> (IpAddr, bool) {
    match addr {
        IpAddr::V4(v4) => {
            let (octets, wrapped) = increment_octets(v4.octets(), bit);
            (IpAddr::from(octets), wrapped)
        }
        IpAddr::V6(v6) => {
            let (octets, wrapped) = increment_octets(v6.octets(), bit);
            (IpAddr::from(octets), wrapped)
        }
    }
}

fn increment_octets<const N: usize>(mut octets: [u8; N], bit: u8) -> ([u8; N], bool) {
    debug_assert!(bit as usize <= N * 8);
    if bit == 0 {
        return ([0; N], true);
    }
    let octet = ((bit - 1) / 8) as usize;
    let step = 128u16 >> ((bit - 1) % 8);
    let mut sum = octets[octet] as u16 + step;
    octets[octet] = sum as u8;
    let mut carry = sum >> 8;
    let mut i = octet;
    while carry != 0 {
        if i == 0 {
            return ([0; N], true);
        }
        i -= 1;
        sum = octets[i] as u16 + carry;
        octets[i] = sum as u8;
        carry = sum >> 8;
    }
    (octets, false)
}

/// Parse CIDR text into a canonical prefix. Host bits below the mask are
/// cleared rather than rejected, so stored prefixes always compare and key
/// on the network address alone.
pub fn parse_prefix(text: &str) -> Result<IpNet, Error> {
    let net: IpNet = text.parse().map_err(|e: ipnet::AddrParseError| Error::Parse {
        text: text.to_string(),
        reason: e.to_string(),
    })?;
    Ok(net.trunc())
}

/// Join prefixes into the ordered, comma-separated identity of a
/// multi-subnet resource.
pub fn format_multi_id(prefixes: &[IpNet]) -> String {
    prefixes
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a multi-subnet identity back into prefixes. Every member must
/// parse and carry the same mask length.
pub fn parse_multi_id(id: &str) -> Result<Vec<IpNet>, Error> {
    let mut prefixes = Vec::new();
    for part in id.split(',') {
        let prefix = parse_prefix(part)
            .map_err(|_| Error::InvalidId(format!("{part:?} is not a CIDR block")))?;
        prefixes.push(prefix);
    }
    let mask = prefixes[0].prefix_len();
    for p in &prefixes {
        if p.prefix_len() != mask {
            return Err(Error::InvalidId(format!(
                "expected all cidr masks to be the same size, but found {} and {}",
                mask,
                p.prefix_len()
            )));
        }
    }
    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn increment_steps_at_the_mask_boundary() {
        let (next, wrapped) = increment_at_bit(IpAddr::from(Ipv4Addr::new(10, 0, 0, 0)), 24);
        assert!(!wrapped);
        assert_eq!(next, IpAddr::from(Ipv4Addr::new(10, 0, 1, 0)));
    }

    #[test]
    fn increment_carries_across_octets() {
        let (next, wrapped) = increment_at_bit(IpAddr::from(Ipv4Addr::new(10, 0, 255, 0)), 24);
        assert!(!wrapped);
        assert_eq!(next, IpAddr::from(Ipv4Addr::new(10, 1, 0, 0)));
    }

    #[test]
    fn increment_wraps_to_zero() {
        let (next, wrapped) = increment_at_bit(IpAddr::from(Ipv4Addr::new(255, 255, 255, 255)), 32);
        assert!(wrapped);
        assert_eq!(next, IpAddr::from(Ipv4Addr::new(0, 0, 0, 0)));
    }

    #[test]
    fn increment_at_bit_zero_wraps_immediately() {
        let (_, wrapped) = increment_at_bit(IpAddr::from(Ipv4Addr::new(10, 0, 0, 0)), 0);
        assert!(wrapped);
    }

    #[test]
    fn v6_increment_at_bit_64() {
        let addr: IpAddr = "fd18:fad4:bce5:44ff::".parse().unwrap();
        let (next, wrapped) = increment_at_bit(addr, 64);
        assert!(!wrapped);
        assert_eq!(next, "fd18:fad4:bce5:4500::".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn widened_v4_keys_sit_in_the_low_bits() {
        let p = parse_prefix("10.0.0.0/8").unwrap();
        assert_eq!(widened_key(&p), 0x0A00_0000);
    }

    #[test]
    fn parse_prefix_masks_host_bits() {
        assert_eq!(parse_prefix("10.0.5.7/16").unwrap().to_string(), "10.0.0.0/16");
    }

    #[test]
    fn multi_id_rejects_empty_and_mixed_input() {
        assert!(parse_multi_id("").is_err());
        assert!(parse_multi_id("10.0.0.0/24,10.0.1.0/25").is_err());
        assert!(parse_multi_id("10.0.0.0/24,10.0.1.0/24").is_ok());
    }
}
