use super::RoomTypeId;
use serde::{Deserialize, Serialize};

/// A pool of interchangeable special rooms (labs, gyms, music rooms).
/// Regular classrooms are not modelled; a subject without a room type
/// can always be placed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomType {
    pub id: RoomTypeId,
    pub name: String,
    /// Number of rooms of this type that can be used concurrently
    pub capacity: u32,
}

impl RoomType {
    /// Stable instance label, `1..=capacity`
    pub fn instance_label(&self, n: u32) -> String {
        format!("{}-{}", self.id, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_labels() {
        let rt = RoomType {
            id: "nw".into(),
            name: "Naturwissenschaften".to_string(),
            capacity: 3,
        };
        assert_eq!(rt.instance_label(1), "nw-1");
        assert_eq!(rt.instance_label(3), "nw-3");
    }
}
