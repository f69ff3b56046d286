use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static POSE_CATALOG_JSON: &str = include_str!("poses.json");

static POSE_CATALOG: Lazy<Vec<PoseDescriptor>> = Lazy::new(|| {
    serde_json::from_str(POSE_CATALOG_JSON).unwrap_or_else(|e| {
        log::error!("Embedded pose catalog is invalid: {}", e);
        Vec::new()
    })
});

/// A reference pose users can pick for the edit step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoseDescriptor {
    pub id: String,
    pub label: String,
    pub reference_image: String,
    pub description: String,
}

/// All poses, in display order.
pub fn pose_catalog() -> &'static [PoseDescriptor] {
    &POSE_CATALOG
}

pub fn find_pose(id: &str) -> Option<&'static PoseDescriptor> {
    POSE_CATALOG.iter().find(|pose| pose.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads_five_poses() {
        let catalog = pose_catalog();
        assert_eq!(catalog.len(), 5);
        let ids: Vec<_> = catalog.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["pose1", "pose2", "pose3", "pose4", "pose5"]);
        assert!(catalog.iter().all(|p| !p.description.is_empty()));
    }

    #[test]
    fn test_find_pose() {
        let pose = find_pose("pose3").unwrap();
        assert_eq!(pose.label, "Pose 3");
        assert_eq!(pose.reference_image, "poses/pose3.jpg");
        assert!(find_pose("pose9").is_none());
    }
}
