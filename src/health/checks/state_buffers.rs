//! State buffer health check

use crate::config::InputSettings;
use crate::health::check::{CheckResult, Findings, SystemCheck};
use crate::state::{StateBuffers, UpdateType};

/// Allocates, migrates and zeroes a small set of device blocks
pub struct StateBufferCheck;

impl StateBufferCheck {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StateBufferCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCheck for StateBufferCheck {
    fn name(&self) -> &'static str {
        "State Buffers"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Validates buffer allocation, migration by index and zeroing")
    }

    fn check(&self, settings: &InputSettings) -> CheckResult {
        let mut findings = Findings::new();
        let mask = settings.update_mask();

        let mut old = StateBuffers::new();
        let offsets = match old.allocate_all(mask, &[3, 16, 5]) {
            Ok(offsets) => offsets,
            Err(e) => {
                findings.fail(e);
                return findings.finish("");
            }
        };
        findings.expect(
            offsets.iter().all(|o| o % 4 == 0),
            format!("Aligned device offsets {offsets:?}"),
        );

        let passes: Vec<UpdateType> = UpdateType::ALL
            .into_iter()
            .filter(|p| old.is_allocated(*p))
            .collect();
        findings.expect(!passes.is_empty(), format!("Allocated passes {passes:?}"));

        for &pass in &passes {
            if let Some(buffers) = old.buffers_mut(pass) {
                for device in 0..3 {
                    buffers.front_mut(device).write(0, &[device as u8 + 1; 4]);
                }
            }
        }

        // Drop the middle device
        let mut new = StateBuffers::new();
        if let Err(e) = new.allocate_all(mask, &[3, 5]) {
            findings.fail(e);
            return findings.finish("");
        }
        new.migrate_all(&old, &[Some(0), Some(2)]);
        old.free_all();

        let migrated = passes.iter().all(|&pass| {
            new.front(pass, 0).is_some_and(|v| v.bytes()[..3] == [1; 3])
                && new.front(pass, 1).is_some_and(|v| v.bytes()[..4] == [3; 4])
        });
        findings.expect(migrated, "Device states migrated by index");
        findings.expect(old.total_size() == 0, "Old buffers released");

        new.zero_device(1);
        let zeroed = passes.iter().all(|&pass| {
            new.front(pass, 1).is_some_and(|v| v.bytes().iter().all(|b| *b == 0))
        });
        findings.expect(zeroed, "Device block zeroed");

        findings.finish(format!("{} passes with buffers", passes.len()))
    }
}
