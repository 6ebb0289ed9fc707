//! Name join between the NetIM inventory and the discovered plugs.

use std::collections::HashSet;

use tracing::debug;

use crate::netim::InventoryDevice;

/// A NetIM device that is powered through a discovered plug. `name` is
/// the uppercased inventory name; valid for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDevice {
    pub name: String,
    pub platform_id: String,
}

/// Join the inventory against the plug names, case-insensitively on
/// both sides. Inventory devices without a matching plug are silently
/// excluded; inventory order is preserved. An empty result means
/// "nothing to do", not an error.
pub fn reconcile(inventory: &[InventoryDevice], source_names: &[String]) -> Vec<ManagedDevice> {
    let plugs: HashSet<String> = source_names.iter().map(|n| n.to_uppercase()).collect();

    inventory
        .iter()
        .filter_map(|device| {
            let name = device.name.to_uppercase();
            if !plugs.contains(&name) {
                return None;
            }
            debug!(device = %name, "plug found for managed device");
            Some(ManagedDevice {
                name,
                platform_id: device.device_access_info_id.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inventory_device(name: &str, id: &str) -> InventoryDevice {
        InventoryDevice {
            name: name.to_string(),
            device_access_info_id: id.to_string(),
        }
    }

    #[test]
    fn test_matching_device_is_mapped() {
        let inventory = vec![inventory_device("RTR1", "id-1")];
        let result = reconcile(&inventory, &["RTR1".to_string()]);
        assert_eq!(
            result,
            vec![ManagedDevice { name: "RTR1".to_string(), platform_id: "id-1".to_string() }]
        );
    }

    #[test]
    fn test_no_overlap_yields_empty() {
        let inventory = vec![inventory_device("RTR1", "id-1")];
        assert!(reconcile(&inventory, &["SW2".to_string()]).is_empty());
        assert!(reconcile(&inventory, &[]).is_empty());
        assert!(reconcile(&[], &["RTR1".to_string()]).is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive_on_both_sides() {
        let inventory = vec![inventory_device("rtr1", "id-1"), inventory_device("Sw2", "id-2")];
        let result = reconcile(&inventory, &["RTR1".to_string(), "sw2".to_string()]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "RTR1");
        assert_eq!(result[1].name, "SW2");
    }

    #[test]
    fn test_inventory_order_is_preserved() {
        let inventory = vec![
            inventory_device("C3", "id-3"),
            inventory_device("A1", "id-1"),
            inventory_device("B2", "id-2"),
        ];
        let names: Vec<String> = ["A1", "B2", "C3"].iter().map(|s| s.to_string()).collect();
        let result = reconcile(&inventory, &names);
        let order: Vec<&str> = result.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["C3", "A1", "B2"]);
    }

    #[test]
    fn test_result_never_exceeds_inventory() {
        let inventory = vec![inventory_device("RTR1", "id-1")];
        let names: Vec<String> = ["RTR1", "SW2", "AP3"].iter().map(|s| s.to_string()).collect();
        let result = reconcile(&inventory, &names);
        assert_eq!(result.len(), 1);
    }
}
