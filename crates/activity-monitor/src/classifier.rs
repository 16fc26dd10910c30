//! Build-agent classification heuristic.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. image reference contains `azure` and `agent`, or `azp`, or `vsts`
//! 2. a label where key or value contains `azure` and key or value contains `agent`
//! 3. an environment entry containing `azp_` or `vsts_`
//!
//! All comparisons are case-insensitive.

use agentwatch_core::types::ContainerDetails;

/// Which rule classified a container as a tracked workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedRule {
    /// Image reference
    Image,
    /// Container label
    Label,
    /// Environment variable
    Env,
}

type Rule = fn(&ContainerDetails) -> bool;

const RULES: [(MatchedRule, Rule); 3] = [
    (MatchedRule::Image, image_matches),
    (MatchedRule::Label, labels_match),
    (MatchedRule::Env, env_matches),
];

/// Returns the first rule that classifies `details` as a build agent.
pub fn classify(details: &ContainerDetails) -> Option<MatchedRule> {
    RULES
        .iter()
        .find(|(_, rule)| rule(details))
        .map(|(matched, _)| *matched)
}

/// Whether `details` describe a tracked build-agent workload.
pub fn is_tracked_workload(details: &ContainerDetails) -> bool {
    classify(details).is_some()
}

fn image_matches(details: &ContainerDetails) -> bool {
    let image = details.image.to_lowercase();
    (image.contains("azure") && image.contains("agent"))
        || image.contains("azp")
        || image.contains("vsts")
}

fn labels_match(details: &ContainerDetails) -> bool {
    details.labels.iter().any(|(key, value)| {
        let key = key.to_lowercase();
        let value = value.to_lowercase();
        (key.contains("azure") || value.contains("azure"))
            && (key.contains("agent") || value.contains("agent"))
    })
}

fn env_matches(details: &ContainerDetails) -> bool {
    details.env.iter().any(|entry| {
        let entry = entry.to_lowercase();
        entry.contains("azp_") || entry.contains("vsts_")
    })
}
