//! Package listing.

use std::fmt;

use anyhow::Result;

use crate::builder::BuildRecordStore;
use crate::core::PackageDescriptor;
use crate::util::context::GlobalContext;

/// Build state of a package as seen from its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageState {
    UpToDate,
    /// Recorded, but for another version or other sources
    Stale,
    NotBuilt,
    /// The descriptor does not load
    Invalid(String),
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageState::UpToDate => write!(f, "up to date"),
            PackageState::Stale => write!(f, "stale"),
            PackageState::NotBuilt => write!(f, "not built"),
            PackageState::Invalid(reason) => write!(f, "invalid ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStatus {
    pub name: String,
    pub declared: Option<String>,
    pub recorded: Option<String>,
    pub state: PackageState,
}

/// Every package with a descriptor under the source dir, in name order.
pub fn list(ctx: &GlobalContext) -> Result<Vec<PackageStatus>> {
    let records = BuildRecordStore::new(ctx);
    let mut statuses = Vec::new();

    for name in ctx.package_names()? {
        let recorded = records.read(&name)?.map(|r| r.version);
        let desc = match PackageDescriptor::load(&name, &ctx.descriptor_path(&name)) {
            Ok(desc) => desc,
            Err(e) => {
                statuses.push(PackageStatus {
                    name,
                    declared: None,
                    recorded,
                    state: PackageState::Invalid(e.to_string()),
                });
                continue;
            }
        };

        let state = if recorded.is_none() {
            PackageState::NotBuilt
        } else if records.is_up_to_date(&desc)? {
            PackageState::UpToDate
        } else {
            PackageState::Stale
        };

        statuses.push(PackageStatus {
            name,
            declared: Some(desc.version),
            recorded,
            state,
        });
    }
    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::ProjectFixture;

    #[test]
    fn test_list_states() {
        let project = ProjectFixture::new();
        project.package(r#"{ "name": "opus", "version": "1.3" }"#);
        project.package(r#"{ "name": "zlib", "version": "1.3" }"#);
        project.package(r#"{ "name": "speex", "version": "1.2" }"#);
        project.package_file("broken", "package.json", "{");

        let ctx = project.ctx();
        let records = BuildRecordStore::new(&ctx);
        std::fs::create_dir_all(ctx.canonical_dir("zlib")).unwrap();
        let zlib = PackageDescriptor::load("zlib", &ctx.descriptor_path("zlib")).unwrap();
        records.write(&zlib).unwrap();
        std::fs::write(ctx.record_path("speex"), "1.1").unwrap();

        let statuses = list(&ctx).unwrap();
        let states: Vec<(&str, &PackageState)> =
            statuses.iter().map(|s| (s.name.as_str(), &s.state)).collect();
        assert_eq!(states.len(), 4);
        assert_eq!(states[0].0, "broken");
        assert!(matches!(states[0].1, PackageState::Invalid(_)));
        assert_eq!(states[1], ("opus", &PackageState::NotBuilt));
        assert_eq!(states[2], ("speex", &PackageState::Stale));
        assert_eq!(states[3], ("zlib", &PackageState::UpToDate));
        assert_eq!(statuses[2].recorded.as_deref(), Some("1.1"));
    }
}
