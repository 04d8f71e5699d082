use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

/// Domains that bypass robots.txt entirely — public reports from
/// intergovernmental organizations that are known-safe to crawl and
/// occasionally ship overly broad `Disallow` rules aimed at generic
/// scrapers. Ported verbatim from the original research system's
/// `PUBLIC_ALLOWLIST`.
pub static PUBLIC_ALLOWLIST: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "unwto.org",
        "www.unwto.org",
        "iata.org",
        "www.iata.org",
        "wttc.org",
        "www.wttc.org",
        "weforum.org",
        "www.weforum.org",
        "oecd.org",
        "www.oecd.org",
        "worldbank.org",
        "www.worldbank.org",
        "imf.org",
        "www.imf.org",
        "who.int",
        "www.who.int",
        "unesco.org",
        "www.unesco.org",
        "un.org",
        "www.un.org",
    ]
});

/// Minimal robots.txt ruleset: disallow/allow path prefixes for a
/// user-agent group, matching the subset of `RobotFileParser` semantics
/// this pipeline actually depends on (longest-prefix-match precedence, `*`
/// group fallback).
#[derive(Clone, Debug, Default)]
struct RuleSet {
    disallow: Vec<String>,
    allow: Vec<String>,
}

impl RuleSet {
    fn can_fetch(&self, path: &str) -> bool {
        let mut best: Option<(usize, bool)> = None; // (prefix_len, is_allow)
        for rule in &self.allow {
            if path.starts_with(rule.as_str()) {
                best = match best {
                    Some((len, _)) if len >= rule.len() => best,
                    _ => Some((rule.len(), true)),
                };
            }
        }
        for rule in &self.disallow {
            if rule.is_empty() || path.starts_with(rule.as_str()) {
                best = match best {
                    Some((len, _)) if len >= rule.len() => best,
                    _ => Some((rule.len(), false)),
                };
            }
        }
        best.map(|(_, allow)| allow).unwrap_or(true)
    }
}

fn parse_robots_txt(body: &str, user_agent: &str) -> RuleSet {
    let mut groups: Vec<(Vec<String>, RuleSet)> = Vec::new();
    let mut current_agents: Vec<String> = Vec::new();
    let mut current_rules = RuleSet::default();
    let mut in_group = false;

    for raw_line in body.lines() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else { continue };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                if in_group && !current_agents.is_empty() {
                    groups.push((std::mem::take(&mut current_agents), std::mem::take(&mut current_rules)));
                }
                current_agents.push(value.to_lowercase());
                in_group = true;
            }
            "disallow" => current_rules.disallow.push(value.to_string()),
            "allow" => current_rules.allow.push(value.to_string()),
            _ => {}
        }
    }
    if !current_agents.is_empty() {
        groups.push((current_agents, current_rules));
    }

    let agent_lower = user_agent.to_lowercase();
    for (agents, rules) in &groups {
        if agents.iter().any(|a| a != "*" && agent_lower.contains(a.as_str())) {
            return rules.clone();
        }
    }
    for (agents, rules) in &groups {
        if agents.iter().any(|a| a == "*") {
            return rules.clone();
        }
    }
    RuleSet::default()
}

/// Cache of parsed robots.txt rulesets, one fetch per host for the life of
/// the process.
pub struct RobotsCache {
    client: reqwest::Client,
    timeout: Duration,
    cache: Mutex<HashMap<String, RuleSet>>,
}

impl RobotsCache {
    pub fn new(client: reqwest::Client, timeout_secs: u64) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `url` may be fetched under `user_agent`. Allowlisted hosts
    /// and hosts whose robots.txt cannot be fetched/parsed are allowed by
    /// default, matching the original's fail-open policy.
    pub async fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else { return true };
        let Some(host) = parsed.host_str() else { return true };
        let host = host.to_lowercase();

        if PUBLIC_ALLOWLIST.iter().any(|h| *h == host) {
            return true;
        }

        let rules = {
            let mut cache = self.cache.lock().await;
            if let Some(rules) = cache.get(&host) {
                rules.clone()
            } else {
                let rules = self.fetch_rules(&parsed, user_agent).await;
                cache.insert(host.clone(), rules.clone());
                rules
            }
        };

        rules.can_fetch(parsed.path())
    }

    async fn fetch_rules(&self, parsed: &url::Url, user_agent: &str) -> RuleSet {
        let robots_url = format!("{}://{}/robots.txt", parsed.scheme(), parsed.host_str().unwrap_or(""));
        match self.client.get(&robots_url).timeout(self.timeout).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => parse_robots_txt(&body, user_agent),
                Err(_) => RuleSet::default(),
            },
            _ => RuleSet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallow_rule_blocks_matching_path() {
        let rules = parse_robots_txt("User-agent: *\nDisallow: /private/\n", "eatc/1.0");
        assert!(!rules.can_fetch("/private/page"));
        assert!(rules.can_fetch("/public/page"));
    }

    #[test]
    fn allow_overrides_longer_prefix_disallow() {
        let rules = parse_robots_txt("User-agent: *\nDisallow: /\nAllow: /public/\n", "eatc/1.0");
        assert!(rules.can_fetch("/public/page"));
        assert!(!rules.can_fetch("/private/page"));
    }

    #[test]
    fn missing_robots_allows_everything() {
        let rules = RuleSet::default();
        assert!(rules.can_fetch("/anything"));
    }
}
