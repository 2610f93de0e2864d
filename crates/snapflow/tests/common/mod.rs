use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_snapflow_kdl(&self, content: &str) {
        let path = self.root.path().join("snapflow.kdl");
        fs::write(path, content).unwrap();
    }

    /// Seed `.snapflow/state.json` with one realized record
    #[allow(dead_code)]
    pub fn write_tracked_snapshot(&self, name: &str, id: &str, instance_id: &str) {
        let dir = self.root.path().join(".snapflow");
        fs::create_dir_all(&dir).unwrap();

        let state = serde_json::json!({
            "version": 1,
            "updated_at": "2026-01-01T00:00:00Z",
            "resources": {
                name: {
                    "declaration": {
                        "name": name,
                        "source_id": instance_id,
                        "safe_mode": false,
                        "mode": { "kind": "one_shot" }
                    },
                    "id": id,
                    "lifecycle": "realized",
                    "attributes": null,
                    "created_at": "2026-01-01T00:00:00Z",
                    "updated_at": "2026-01-01T00:00:00Z"
                }
            }
        });
        fs::write(dir.join("state.json"), state.to_string()).unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }
}
