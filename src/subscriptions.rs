use std::collections::HashSet;

/// Set of topics a single broker is subscribed to, with a running count of
/// how many contain a wildcard (`+` or `#`).
///
/// All operations are amortized O(1); the wildcard count is maintained
/// incrementally rather than recomputed on each query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SubscriptionSet {
    topics: HashSet<String>,
    wildcard_count: u32,
}

fn is_wildcard(topic: &str) -> bool {
    topic.contains('+') || topic.contains('#')
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the topic was newly added.
    pub fn add(&mut self, topic: impl Into<String>) -> bool {
        let topic = topic.into();
        let wildcard = is_wildcard(&topic);
        let added = self.topics.insert(topic);
        if added && wildcard {
            self.wildcard_count += 1;
        }
        added
    }

    /// Returns true if the topic was present and removed.
    pub fn remove(&mut self, topic: &str) -> bool {
        let removed = self.topics.remove(topic);
        if removed && is_wildcard(topic) {
            self.wildcard_count -= 1;
        }
        removed
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub fn size(&self) -> usize {
        self.topics.len()
    }

    pub fn wildcard_count(&self) -> u32 {
        self.wildcard_count
    }

    pub fn has_all(&self, topics: &HashSet<String>) -> bool {
        topics.iter().all(|t| self.topics.contains(t))
    }

    pub fn for_each(&self, mut f: impl FnMut(&str)) {
        self.topics.iter().for_each(|t| f(t));
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    /// Replaces the whole set with `topics`, using the supplied
    /// `wildcard_count` rather than rescanning (used by the pending→active
    /// swap, where the wildcard count was already tracked on the pending
    /// side).
    pub(crate) fn replace(&mut self, topics: HashSet<String>, wildcard_count: u32) {
        self.topics = topics;
        self.wildcard_count = wildcard_count;
    }

    pub(crate) fn clear(&mut self) {
        self.topics.clear();
        self.wildcard_count = 0;
    }

    /// Partitions the set into batches whose total topic-character length
    /// does not exceed `char_budget`; a single over-budget topic forms its
    /// own batch. Invokes `callback(batch, index, is_first, is_last)` for
    /// each batch. An empty set still invokes the callback once, with an
    /// empty batch marked both first and last (§9 open question (a)).
    pub fn batch_topics(
        &self,
        char_budget: usize,
        mut callback: impl FnMut(&[&str], usize, bool, bool),
    ) {
        if self.topics.is_empty() {
            callback(&[], 0, true, true);
            return;
        }

        let mut batches: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        // Iteration order over a HashSet is unspecified but deterministic
        // for a given instance, matching the spec's ordering requirement.
        for topic in &self.topics {
            let len = topic.len();
            if !current.is_empty() && current_len + len > char_budget {
                batches.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push(topic.as_str());
            current_len += len;
        }
        if !current.is_empty() {
            batches.push(current);
        }

        let last_index = batches.len() - 1;
        for (index, batch) in batches.into_iter().enumerate() {
            callback(&batch, index, index == 0, index == last_index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_count_tracks_plus_and_hash() {
        let mut s = SubscriptionSet::new();
        assert!(s.add("a/b"));
        assert!(s.add("c/+"));
        assert!(s.add("d/#"));
        assert_eq!(s.wildcard_count(), 2);

        assert!(s.remove("c/+"));
        assert_eq!(s.wildcard_count(), 1);
    }

    #[test]
    fn add_remove_idempotent() {
        let mut s = SubscriptionSet::new();
        assert!(s.add("a/b"));
        assert!(!s.add("a/b"));
        assert!(s.remove("a/b"));
        assert!(!s.remove("a/b"));
        assert_eq!(s.wildcard_count(), 0);
    }

    #[test]
    fn batch_topics_empty_set_calls_back_once() {
        let s = SubscriptionSet::new();
        let mut calls = Vec::new();
        s.batch_topics(100, |batch, idx, first, last| {
            calls.push((batch.to_vec(), idx, first, last));
        });
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (vec![], 0, true, true));
    }

    #[test]
    fn batch_topics_respects_char_budget_and_covers_all() {
        let mut s = SubscriptionSet::new();
        for t in ["a", "bb", "ccc", "dddd", "eeeee"] {
            s.add(t);
        }
        let mut seen = Vec::new();
        let mut batch_count = 0;
        s.batch_topics(5, |batch, idx, first, last| {
            assert_eq!(idx, batch_count);
            assert_eq!(first, idx == 0);
            let total_len: usize = batch.iter().map(|t| t.len()).sum();
            assert!(total_len <= 5 || batch.len() == 1);
            seen.extend(batch.iter().map(|s| s.to_string()));
            batch_count += 1;
            let _ = last;
        });
        seen.sort();
        let mut expected: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn batch_topics_single_over_budget_topic_is_its_own_batch() {
        let mut s = SubscriptionSet::new();
        s.add("a-very-long-topic-name-that-exceeds-the-budget");
        let mut calls = 0;
        s.batch_topics(4, |batch, _, first, last| {
            assert_eq!(batch.len(), 1);
            assert!(first && last);
            calls += 1;
        });
        assert_eq!(calls, 1);
    }
}
