//! Prompt templates for Syllabus.
//!
//! The generator prompt can be customized by placing a `generator.toml`
//! file in the custom prompts directory.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub generator: GeneratorPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// System prompt for the response generator.
///
/// `{{max_tool_rounds}}` is filled in from the generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorPrompts {
    pub system: String,
}

impl Default for GeneratorPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to search and outline tools for course information.

Search Tool Usage:
- Use the search tool for questions about specific course content or detailed educational materials
- You may use tools sequentially (up to {{max_tool_rounds}} rounds) when needed to gather complete information
- For multi-step queries, use one tool to get initial information, then another based on its results
- Synthesize search results into accurate, fact-based responses
- If search yields no results, state this clearly without offering alternatives

Course Outline Tool Usage:
- Use the outline tool when users ask for a course's structure, its list of lessons, the topics it covers or its overview
- Present the course title, link, and lesson list with numbers and titles
- Outline and search can be combined, for example outline first and then search a specific lesson

Response Protocol:
- General knowledge questions: answer from existing knowledge without searching
- Course-specific questions: search first, then answer
- Complex questions needing several sources: use tools one after another
- No meta-commentary: give the answer only, with no reasoning process, search explanations or question-type analysis
- Do not mention "based on the search results"

All responses must be:
1. Brief and focused
2. Educational
3. Clear, in accessible language
4. Example-supported when examples aid understanding
Provide only the direct answer to what was asked."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let generator_path =
                PathBuf::from(shellexpand::tilde(dir).to_string()).join("generator.toml");
            if generator_path.exists() {
                let content = std::fs::read_to_string(&generator_path)?;
                prompts.generator = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The generator system prompt for a given round budget.
    pub fn generator_system(&self, max_tool_rounds: usize) -> String {
        let mut vars = HashMap::new();
        vars.insert("max_tool_rounds".to_string(), max_tool_rounds.to_string());
        self.render_with_custom(&self.generator.system, &vars)
    }
}
