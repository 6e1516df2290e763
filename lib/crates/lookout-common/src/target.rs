//! File-based service discovery descriptors.
//!
//! The scrape coordinator polls a directory of `<instance>.json` files, each
//! holding an array of descriptors.

use serde::{Deserialize, Serialize};

/// Labels attached to every scraped series of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLabels {
    pub instance: String,
    pub job: String,
}

/// One entry of a target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub targets: Vec<String>,
    pub labels: TargetLabels,
}

impl TargetDescriptor {
    /// One `host:port` target; IPv6 literals are bracketed.
    #[must_use]
    pub fn new(instance: &str, ip: &str, port: u16, job: &str) -> Self {
        let target = match ip.parse::<core::net::IpAddr>() {
            Ok(core::net::IpAddr::V6(v6)) => core::net::SocketAddr::from((v6, port)).to_string(),
            _ => format!("{ip}:{port}"),
        };
        Self {
            targets: vec![target],
            labels: TargetLabels {
                instance: instance.to_string(),
                job: job.to_string(),
            },
        }
    }
}

/// Render the full target file for one descriptor.
///
/// Output is deterministic (fixed field order, trailing newline) so that
/// re-registering unchanged values yields byte-identical files.
pub fn render_target_file(descriptor: &TargetDescriptor) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(&[descriptor])?;
    out.push('\n');
    Ok(out)
}
