//! The fixed demo topology: nine parts of a light aircraft, all built by the
//! same manufacturer and joined into one fabric.

use std::sync::Arc;

use anyhow::{Context, Result};
use partledger_protocol::config::NodeConfig;
use partledger_protocol::network::{BroadcastFabric, Node};

pub const MANUFACTURER: &str = "Sckzor Industries";

/// Name, serial number and model number of one demo part.
pub struct PartSpec {
    pub name: &'static str,
    pub serial_number: &'static str,
    pub model_number: &'static str,
}

const fn part(
    name: &'static str,
    serial_number: &'static str,
    model_number: &'static str,
) -> PartSpec {
    PartSpec {
        name,
        serial_number,
        model_number,
    }
}

pub const DEMO_PARTS: [PartSpec; 9] = [
    part("Vertical Stabilizer", "LKYP-U78J-6W54-MHBP", "MX540"),
    part("Rudder", "LBMR-HLXA-GQH5-6TQ7", "TY850"),
    part("Elevator", "PFEW-8XEJ-RZ2J-LUPA", "UL100"),
    part("Horizontal Stabilizer", "JZUA-FQVM-EH5B-E7DY", "KH300"),
    part("Ailerons", "W4TP-7SHQ-B27V-TZGW", "KL403"),
    part("Wing", "YYG4-3F7B-TNXW-ALQE", "CX410"),
    part("Landing Gear", "LSRK-TJHK-NWEP-9WR4", "VB930"),
    part("Fuselage", "MDX6-L28Z-6GXS-FKYC", "ZD020"),
    part("Propellor", "BUYZ-U64Y-O0B3-U771", "UI960"),
];

/// Creates one node per demo part, all registered with `fabric`.
pub fn build(fabric: &Arc<BroadcastFabric>, config: &NodeConfig) -> Result<Vec<Node>> {
    DEMO_PARTS
        .iter()
        .map(|spec| {
            Node::create(
                spec.name,
                MANUFACTURER,
                spec.serial_number,
                spec.model_number,
                Arc::clone(fabric),
                config.clone(),
            )
            .with_context(|| format!("failed to create node for {}", spec.name))
        })
        .collect()
}

/// The node that node `i` hands its blocks to.
pub fn ring_peer(i: usize, len: usize) -> usize {
    (i + 1) % len
}

/// Finds a node by part name, ignoring case.
pub fn find<'a>(nodes: &'a [Node], name: &str) -> Option<(usize, &'a Node)> {
    nodes
        .iter()
        .enumerate()
        .find(|(_, n)| n.name().eq_ignore_ascii_case(name.trim()))
}
