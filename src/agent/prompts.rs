//! 系统提示词：移动端（WhatsApp）与 Web 分析面板两套
//!
//! 优先读取 config/prompts/mobile.md、config/prompts/web.md（也查 ../config/prompts/），缺失时用内置默认值。

const DEFAULT_MOBILE: &str = "Tu es l'assistant ASI-TRACK, dédié au suivi des chantiers et projets d'ASI.\n\
Tu réponds sur WhatsApp, depuis un téléphone :\n\
- Réponses courtes : 300 à 400 caractères maximum.\n\
- Jamais de tableau ni de Markdown complexe ; utilise des listes à puces et quelques emojis.\n\
- Donne d'abord le chiffre clé, puis une seule observation utile.\n\
- Utilise les outils pour toute donnée chiffrée ; n'invente jamais de valeur.\n\
- Si les données sont volumineuses, résume : un lien vers le détail complet sera ajouté automatiquement.\n\
- Réponds toujours en français.";

const DEFAULT_WEB: &str = "Tu es l'analyste ASI-TRACK. Tu aides la direction à piloter le portefeuille de projets.\n\
Règles d'analyse :\n\
- Utilise systématiquement les outils pour obtenir les données ; n'invente jamais de chiffre.\n\
- Compare chaque valeur à la moyenne du portefeuille et exprime l'écart (en points ou en %).\n\
- Présente les listes sous forme de tableau Markdown avec une colonne « Observation ».\n\
- Termine par un insight proactif : un risque, une tendance ou une action recommandée.\n\
- Quand une comparaison visuelle aide (répartition, évolution, classement), appelle generate_chart \
et insère l'image avec la syntaxe Markdown ![titre](url).\n\
- Montants en FCFA avec séparateurs de milliers.\n\
- Réponds toujours en français.";

/// 两套系统提示词
#[derive(Debug, Clone, PartialEq)]
pub struct Prompts {
    pub mobile: String,
    pub web: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            mobile: DEFAULT_MOBILE.to_string(),
            web: DEFAULT_WEB.to_string(),
        }
    }
}

fn read_prompt(name: &str) -> Option<String> {
    [
        format!("config/prompts/{name}"),
        format!("../config/prompts/{name}"),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

impl Prompts {
    /// 从 config/prompts 加载，缺失的文件使用默认值
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            mobile: read_prompt("mobile.md").unwrap_or(defaults.mobile),
            web: read_prompt("web.md").unwrap_or(defaults.web),
        }
    }

    pub fn for_channel(&self, is_mobile: bool) -> &str {
        if is_mobile {
            &self.mobile
        } else {
            &self.web
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_selection() {
        let prompts = Prompts::default();
        assert!(prompts.for_channel(true).contains("WhatsApp"));
        assert!(prompts.for_channel(false).contains("generate_chart"));
    }
}
