use std::net::Ipv4Addr;

use ipnet::{IpNet, Ipv4Net};
use proptest::collection::hash_set;
use proptest::prelude::*;

use netcalc_core::helpers::widened_key;
use netcalc_core::index::PrefixIndex;

fn net(s: &str) -> IpNet {
    s.parse::<IpNet>().unwrap().trunc()
}

fn insert(index: &mut PrefixIndex, s: &str) {
    let p = net(s);
    index.insert(widened_key(&p), p);
}

#[test]
fn walk_visits_keys_in_ascending_order() {
    let mut index = PrefixIndex::new();
    for s in [
        "10.0.3.0/24",
        "10.0.0.0/24",
        "192.168.0.0/16",
        "10.0.2.0/24",
        "10.0.1.0/24",
    ] {
        insert(&mut index, s);
    }
    let visited: Vec<IpNet> = index.iter().map(|(_, p)| p).collect();
    assert_eq!(
        visited,
        vec![
            net("10.0.0.0/24"),
            net("10.0.1.0/24"),
            net("10.0.2.0/24"),
            net("10.0.3.0/24"),
            net("192.168.0.0/16"),
        ]
    );
}

#[test]
fn inserting_the_same_key_replaces_the_value() {
    let mut index = PrefixIndex::new();
    insert(&mut index, "10.0.0.0/24");
    // same network address, different mask: same key
    insert(&mut index, "10.0.0.0/25");
    assert_eq!(index.len(), 1);
    assert_eq!(index.iter().next().unwrap().1, net("10.0.0.0/25"));
}

#[test]
fn delete_is_idempotent() {
    let mut index = PrefixIndex::new();
    insert(&mut index, "10.0.0.0/24");
    insert(&mut index, "10.0.1.0/24");
    let key = widened_key(&net("10.0.0.0/24"));
    assert!(index.delete(key));
    assert!(!index.delete(key));
    assert_eq!(index.len(), 1);
}

#[test]
fn deleting_a_leaf_collapses_its_branch() {
    let mut index = PrefixIndex::new();
    for s in ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24"] {
        insert(&mut index, s);
    }
    assert!(index.delete(widened_key(&net("10.0.1.0/24"))));
    let visited: Vec<IpNet> = index.iter().map(|(_, p)| p).collect();
    assert_eq!(visited, vec![net("10.0.0.0/24"), net("10.0.2.0/24")]);
}

#[test]
fn deleting_an_absent_key_leaves_the_tree_alone() {
    let mut index = PrefixIndex::new();
    insert(&mut index, "10.0.0.0/24");
    assert!(!index.delete(widened_key(&net("10.0.1.0/24"))));
    assert_eq!(index.len(), 1);
}

#[test]
fn walk_stops_when_the_visitor_says_so() {
    let mut index = PrefixIndex::new();
    for s in ["10.0.0.0/24", "10.0.1.0/24", "10.0.2.0/24", "10.0.3.0/24"] {
        insert(&mut index, s);
    }
    let mut seen = 0;
    let stopped = index.walk(|_, _| {
        seen += 1;
        seen == 2
    });
    assert!(stopped);
    assert_eq!(seen, 2);

    let full = index.walk(|_, _| false);
    assert!(!full);
}

#[test]
fn an_iterator_is_a_snapshot() {
    let mut index = PrefixIndex::new();
    insert(&mut index, "10.0.1.0/24");
    insert(&mut index, "10.0.2.0/24");
    let iter = index.iter();
    // mutations after the snapshot are invisible to it
    insert(&mut index, "10.0.0.0/24");
    index.delete(widened_key(&net("10.0.2.0/24")));
    let seen: Vec<IpNet> = iter.map(|(_, p)| p).collect();
    assert_eq!(seen, vec![net("10.0.1.0/24"), net("10.0.2.0/24")]);
    assert_eq!(index.len(), 2);
}

fn host_net(addr: u32) -> IpNet {
    IpNet::V4(Ipv4Net::new(Ipv4Addr::from(addr), 32).unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn walk_order_matches_sorted_keys(addrs in hash_set(any::<u32>(), 1..64)) {
        let mut index = PrefixIndex::new();
        for &addr in &addrs {
            let p = host_net(addr);
            index.insert(widened_key(&p), p);
        }
        let mut expected: Vec<u128> = addrs.iter().map(|&a| a as u128).collect();
        expected.sort_unstable();
        let walked: Vec<u128> = index.iter().map(|(k, _)| k).collect();
        prop_assert_eq!(walked, expected);
    }

    #[test]
    fn deleting_half_keeps_the_rest(addrs in hash_set(any::<u32>(), 2..64)) {
        let addrs: Vec<u32> = addrs.into_iter().collect();
        let mut index = PrefixIndex::new();
        for &addr in &addrs {
            let p = host_net(addr);
            index.insert(widened_key(&p), p);
        }
        let (gone, kept) = addrs.split_at(addrs.len() / 2);
        for &addr in gone {
            prop_assert!(index.delete(widened_key(&host_net(addr))));
        }
        prop_assert_eq!(index.len(), kept.len());
        let mut expected: Vec<u128> = kept.iter().map(|&a| a as u128).collect();
        expected.sort_unstable();
        let walked: Vec<u128> = index.iter().map(|(k, _)| k).collect();
        prop_assert_eq!(walked, expected);
    }
}
