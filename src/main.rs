use heart_flow::{flow, scene::SceneConfig};

fn main() -> anyhow::Result<()> {
    flow::run(SceneConfig::default())
}
