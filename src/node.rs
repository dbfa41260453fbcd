use std::collections::BTreeSet;

/// プレイヤーノードのIDに埋め込まれた公開鍵(PEM)の終端
pub const PUBLIC_KEY_MARKER: &str = "-----END PUBLIC KEY-----";

/// `"Node "` の直後に来るが、ノードIDではない単語
///
/// 例: "Node 3 is already connected to Node 4" の "already"
pub const DEFAULT_NODE_EXCLUSIONS: &[&str] = &["already", "with", "started", "and"];

const NODE_PREFIX: &str = "Node ";

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum NodeKind {
    /// A full node without an embedded player key.
    Main,
    /// A node whose identifier embeds a PEM public key.
    Player,
}

impl NodeKind {
    pub fn of(text: &str) -> Self {
        if is_player_node(text) {
            NodeKind::Player
        } else {
            NodeKind::Main
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Main => write!(f, "main"),
            NodeKind::Player => write!(f, "player"),
        }
    }
}

pub fn is_player_node(text: &str) -> bool {
    text.contains(PUBLIC_KEY_MARKER)
}

#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::of(&self.0)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ログに現れたノードIDを種類ごとに分けたもの（どちらもソート済み・重複なし）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeIds {
    pub main: Vec<NodeId>,
    pub player: Vec<NodeId>,
}

impl NodeIds {
    pub fn len(&self) -> usize {
        self.main.len() + self.player.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.player.is_empty()
    }
}

/// Candidate node IDs mentioned in one message.
///
/// Heuristic, not a grammar: every fragment following `"Node "` is cut at the
/// first space and then at the first newline, and trailing `:`, `,` and `.`
/// are stripped. Words listed in `exclusions` are discarded.
pub fn node_tokens<'a>(message: &'a str, exclusions: &[&str]) -> Vec<&'a str> {
    message
        .split(NODE_PREFIX)
        .skip(1)
        .filter_map(|part| {
            let token = part.split(' ').next().unwrap_or_default();
            let token = token.split('\n').next().unwrap_or_default();
            let token = token.trim_end_matches([':', ',', '.']);
            if token.is_empty() || exclusions.contains(&token) {
                None
            } else {
                Some(token)
            }
        })
        .collect()
}

pub fn extract_node_ids<'a, I>(messages: I, exclusions: &[&str]) -> NodeIds
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    for message in messages {
        if !message.contains(NODE_PREFIX) {
            continue;
        }
        for token in node_tokens(message, exclusions) {
            seen.insert(NodeId::new(token));
        }
    }

    let (player, main): (Vec<_>, Vec<_>) = seen
        .into_iter()
        .partition(|id| id.kind() == NodeKind::Player);
    NodeIds { main, player }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind() {
        assert_eq!(NodeKind::of("3"), NodeKind::Main);
        assert_eq!(
            NodeKind::of("-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----"),
            NodeKind::Player
        );
    }

    #[test]
    fn test_tokens_strip_punctuation() {
        let tokens = node_tokens(
            "Node 1 synced blockchain with Node 2. Valid block mined by Node 7: abc",
            DEFAULT_NODE_EXCLUSIONS,
        );
        assert_eq!(tokens, vec!["1", "2", "7"]);
    }

    #[test]
    fn test_exclusions_are_known_false_positives() {
        // "Node already" / "Node with" / "Node started" / "Node and" は
        // 既知の誤検出。除外リストを空にすると拾ってしまう。
        let message = "Node 3 is already connected to Node and Node with";
        assert_eq!(node_tokens(message, DEFAULT_NODE_EXCLUSIONS), vec!["3"]);
        assert_eq!(node_tokens(message, &[]), vec!["3", "and", "with"]);
    }

    #[test]
    fn test_newline_cuts_token() {
        assert_eq!(node_tokens("Node 12\nnext line", &[]), vec!["12"]);
        assert_eq!(node_tokens("trailing Node ", &[]), Vec::<&str>::new());
    }

    #[test]
    fn test_extract_partitions_disjoint() {
        let messages = [
            "Node 1 started",
            "Node 2 connected to Node 1",
            "Transaction added to Node 1: 42",
            "no nodes here",
        ];
        let ids = extract_node_ids(messages, DEFAULT_NODE_EXCLUSIONS);
        assert_eq!(ids.main, vec![NodeId::new("1"), NodeId::new("2")]);
        assert!(ids.player.is_empty());
        assert_eq!(ids.len(), 2);
        for id in &ids.main {
            assert!(!ids.player.contains(id));
        }
    }

    #[test]
    fn test_pem_key_is_cut_at_first_space() {
        // マーカー自体に空白が含まれるため、トークン切り出しでは
        // "-----END" より後ろが落ちてメインノード扱いになる
        let messages = ["Node abc-----END PUBLIC KEY----- joined"];
        let ids = extract_node_ids(messages, DEFAULT_NODE_EXCLUSIONS);
        assert_eq!(ids.main, vec![NodeId::new("abc-----END")]);
        assert!(ids.player.is_empty());
    }

    #[test]
    fn test_extract_empty() {
        let ids = extract_node_ids(std::iter::empty::<&str>(), DEFAULT_NODE_EXCLUSIONS);
        assert!(ids.is_empty());
    }
}
