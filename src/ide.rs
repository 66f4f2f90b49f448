use crate::backend::dto::IdeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdePreset {
    Code,
    Cursor,
    Idea,
    WebStorm,
    PyCharm,
    GoLand,
    Custom,
}

impl IdePreset {
    pub const ALL: [IdePreset; 7] = [
        IdePreset::Code,
        IdePreset::Cursor,
        IdePreset::Idea,
        IdePreset::WebStorm,
        IdePreset::PyCharm,
        IdePreset::GoLand,
        IdePreset::Custom,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            IdePreset::Code => "code",
            IdePreset::Cursor => "cursor",
            IdePreset::Idea => "idea",
            IdePreset::WebStorm => "webstorm",
            IdePreset::PyCharm => "pycharm",
            IdePreset::GoLand => "goland",
            IdePreset::Custom => "custom",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IdePreset::Code => "VS Code",
            IdePreset::Cursor => "Cursor",
            IdePreset::Idea => "IntelliJ IDEA",
            IdePreset::WebStorm => "WebStorm",
            IdePreset::PyCharm => "PyCharm",
            IdePreset::GoLand => "GoLand",
            IdePreset::Custom => "Custom",
        }
    }

    /// Unknown ids fall back to VS Code.
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|p| p.id() == id)
            .unwrap_or(IdePreset::Code)
    }

    /// Backend config for this preset. Only `Custom` keeps the command.
    pub fn to_config(&self, custom_command: &str) -> IdeConfig {
        let custom_command = custom_command.trim();
        match self {
            IdePreset::Custom => IdeConfig {
                ide_type: "custom".to_string(),
                preset: Some(self.id().to_string()),
                custom_command: (!custom_command.is_empty()).then(|| custom_command.to_string()),
            },
            _ => IdeConfig::preset(self.id()),
        }
    }
}

/// The IDE to launch: project override, then the global setting, then VS Code.
pub fn resolve_ide(project: Option<&IdeConfig>, global: Option<&IdeConfig>) -> (IdePreset, Option<String>) {
    let chosen = project
        .filter(|c| c.preset.is_some() || c.custom_command.is_some())
        .or(global);
    match chosen {
        Some(config) => {
            let preset = config
                .preset
                .as_deref()
                .map(IdePreset::from_id)
                .unwrap_or(IdePreset::Code);
            (preset, config.custom_command.clone())
        }
        None => (IdePreset::Code, None),
    }
}
