use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Kinds of content a model can accept or produce.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Modality: u8 {
        const TEXT  = 1 << 0;
        const IMAGE = 1 << 1;
        const AUDIO = 1 << 2;
        const FILE  = 1 << 3;
    }
}

bitflags! {
    /// Operations a model supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ModelCapability: u16 {
        const CHAT               = 1 << 0;
        const STREAMING          = 1 << 1;
        const TOOLS              = 1 << 2;
        const VISION             = 1 << 3;
        const IMAGE_GENERATION   = 1 << 4;
        const SPEECH_GENERATION  = 1 << 5;
        const SPEECH_RECOGNITION = 1 << 6;
    }
}

/// Which provider style a model is served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Google,
    Ollama,
    OpenRouter,
    ElevenLabs,
}

/// Resolved metadata for a model id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub id: String,
    pub family: String,
    pub provider: ProviderKind,
    pub input_modalities: Modality,
    pub output_modalities: Modality,
    pub capabilities: ModelCapability,
}

struct CatalogRule {
    prefix: &'static str,
    family: &'static str,
    provider: ProviderKind,
    input_modalities: Modality,
    output_modalities: Modality,
    capabilities: ModelCapability,
}

/// A rule table mapping model ids to metadata.
///
/// Callers construct and inject a catalog; there is no process-wide instance,
/// so tests can supply a fresh one per case.
pub struct ModelCatalog {
    rules: Vec<CatalogRule>,
}

impl ModelCatalog {
    pub fn empty() -> Self {
        ModelCatalog { rules: Vec::new() }
    }

    /// A catalog seeded with the common families. First matching prefix wins.
    pub fn with_defaults() -> Self {
        let chat = ModelCapability::CHAT | ModelCapability::STREAMING | ModelCapability::TOOLS;
        ModelCatalog {
            rules: vec![
                CatalogRule {
                    prefix: "gpt-",
                    family: "gpt",
                    provider: ProviderKind::OpenAi,
                    input_modalities: Modality::TEXT | Modality::IMAGE | Modality::FILE,
                    output_modalities: Modality::TEXT,
                    capabilities: chat | ModelCapability::VISION,
                },
                CatalogRule {
                    prefix: "o1",
                    family: "o1",
                    provider: ProviderKind::OpenAi,
                    input_modalities: Modality::TEXT,
                    output_modalities: Modality::TEXT,
                    capabilities: ModelCapability::CHAT,
                },
                CatalogRule {
                    prefix: "dall-e",
                    family: "dall-e",
                    provider: ProviderKind::OpenAi,
                    input_modalities: Modality::TEXT,
                    output_modalities: Modality::IMAGE,
                    capabilities: ModelCapability::IMAGE_GENERATION,
                },
                CatalogRule {
                    prefix: "gemini-",
                    family: "gemini",
                    provider: ProviderKind::Google,
                    input_modalities: Modality::TEXT | Modality::IMAGE | Modality::AUDIO,
                    output_modalities: Modality::TEXT,
                    capabilities: chat | ModelCapability::VISION,
                },
                CatalogRule {
                    prefix: "eleven_",
                    family: "eleven",
                    provider: ProviderKind::ElevenLabs,
                    input_modalities: Modality::TEXT,
                    output_modalities: Modality::AUDIO,
                    capabilities: ModelCapability::SPEECH_GENERATION,
                },
            ],
        }
    }

    /// Register a rule. Later rules are consulted after earlier ones.
    pub fn add_rule(
        &mut self,
        prefix: &'static str,
        family: &'static str,
        provider: ProviderKind,
        input_modalities: Modality,
        output_modalities: Modality,
        capabilities: ModelCapability,
    ) {
        self.rules.push(CatalogRule {
            prefix,
            family,
            provider,
            input_modalities,
            output_modalities,
            capabilities,
        });
    }

    pub fn resolve(&self, id: &str) -> Option<ModelMetadata> {
        self.rules
            .iter()
            .find(|rule| id.starts_with(rule.prefix))
            .map(|rule| ModelMetadata {
                id: id.to_string(),
                family: rule.family.to_string(),
                provider: rule.provider,
                input_modalities: rule.input_modalities,
                output_modalities: rule.output_modalities,
                capabilities: rule.capabilities,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_by_prefix() {
        let catalog = ModelCatalog::with_defaults();
        let meta = catalog.resolve("gemini-2.0-flash").unwrap();
        assert_eq!(meta.family, "gemini");
        assert_eq!(meta.provider, ProviderKind::Google);
        assert!(meta.capabilities.contains(ModelCapability::STREAMING));
    }

    #[test]
    fn test_unknown_id_resolves_none() {
        let catalog = ModelCatalog::with_defaults();
        assert!(catalog.resolve("mystery-model").is_none());
    }

    #[test]
    fn test_injected_rules_do_not_leak() {
        let mut catalog = ModelCatalog::empty();
        catalog.add_rule(
            "local-",
            "local",
            ProviderKind::Ollama,
            Modality::TEXT,
            Modality::TEXT,
            ModelCapability::CHAT,
        );
        assert!(catalog.resolve("local-7b").is_some());

        // A fresh catalog is unaffected
        assert!(ModelCatalog::empty().resolve("local-7b").is_none());
    }

    #[test]
    fn test_flag_serde_round_trip() {
        let modalities = Modality::TEXT | Modality::IMAGE;
        let wire = serde_json::to_value(modalities).unwrap();
        assert_eq!(serde_json::from_value::<Modality>(wire).unwrap(), modalities);

        let capabilities = ModelCapability::CHAT | ModelCapability::STREAMING;
        let wire = serde_json::to_value(capabilities).unwrap();
        assert_eq!(
            serde_json::from_value::<ModelCapability>(wire).unwrap(),
            capabilities
        );
    }

    #[test]
    fn test_speech_model_modalities() {
        let catalog = ModelCatalog::with_defaults();
        let meta = catalog.resolve("eleven_multilingual_v2").unwrap();
        assert!(meta.output_modalities.contains(Modality::AUDIO));
        assert!(meta.capabilities.contains(ModelCapability::SPEECH_GENERATION));
    }
}
