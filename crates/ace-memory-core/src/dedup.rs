//! Near-duplicate detection and canonical-bullet selection.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::bullet::Bullet;
use crate::similarity::{jaccard, token_set};

/// One merge performed by a dedup sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPair {
    pub keeper: String,
    pub absorbed: String,
    pub similarity: f64,
}

/// Whether `first` stays canonical when merged with `second`.
///
/// Higher `helpful - harmful` wins; on a tie the later `created_at` wins; on a
/// full tie `first` is kept.
pub fn first_keeps(first: &Bullet, second: &Bullet) -> bool {
    match first.net_helpfulness().cmp(&second.net_helpfulness()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => first.created_at >= second.created_at,
    }
}

/// Fold `loser` into `keeper` and renormalize the keeper.
pub fn merge_into(keeper: &mut Bullet, loser: &Bullet) {
    keeper.absorb(loser);
    keeper.normalize();
}

/// Merge every pair of bullets whose word overlap exceeds `threshold`.
///
/// Bullets are ordered by `(created_at, id)` and swept once. A bullet that
/// loses a merge is out of the sweep; a keeper keeps comparing against the
/// rest. Content never changes during a merge, so no surviving pair exceeds
/// the threshold afterwards. Returns the survivors (in sweep order) and the
/// merges in the order they happened.
pub fn sweep(mut bullets: Vec<Bullet>, threshold: f64) -> (Vec<Bullet>, Vec<MergedPair>) {
    bullets.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    let tokens: Vec<_> = bullets.iter().map(|b| token_set(&b.content)).collect();
    let mut absorbed = vec![false; bullets.len()];
    let mut merges = Vec::new();

    for i in 0..bullets.len() {
        if absorbed[i] {
            continue;
        }
        for j in (i + 1)..bullets.len() {
            if absorbed[j] {
                continue;
            }
            let similarity = jaccard(&tokens[i], &tokens[j]);
            if similarity <= threshold {
                continue;
            }
            let (keeper, loser) = if first_keeps(&bullets[i], &bullets[j]) {
                (i, j)
            } else {
                (j, i)
            };
            let loser_bullet = bullets[loser].clone();
            merge_into(&mut bullets[keeper], &loser_bullet);
            absorbed[loser] = true;
            merges.push(MergedPair {
                keeper: bullets[keeper].id.clone(),
                absorbed: loser_bullet.id,
                similarity,
            });
            if loser == i {
                break;
            }
        }
    }

    let survivors = bullets
        .into_iter()
        .zip(absorbed)
        .filter_map(|(b, gone)| (!gone).then_some(b))
        .collect();
    (survivors, merges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullet::BulletDraft;
    use chrono::{Duration, TimeZone, Utc};

    fn at(content: &str, helpful: u32, minute: i64) -> Bullet {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Bullet::from_draft(
            BulletDraft::new(content).with_helpful(helpful),
            t0 + Duration::minutes(minute),
        )
        .unwrap()
    }

    const BASE: &str = "Use the calculator for multiplication problems";
    const NEAR: &str = "Use the calculator for multiplication problems always";

    #[test]
    fn test_keeper_prefers_net_helpfulness() {
        let a = at(BASE, 3, 0);
        let mut b = at(NEAR, 3, 5);
        b.harmful_count = 1;
        assert!(first_keeps(&a, &b));
        assert!(!first_keeps(&b, &a));
    }

    #[test]
    fn test_keeper_tie_prefers_newer() {
        let old = at(BASE, 1, 0);
        let new = at(NEAR, 1, 5);
        assert!(!first_keeps(&old, &new));
        assert!(first_keeps(&new, &old));
    }

    #[test]
    fn test_sweep_merges_near_duplicates() {
        let (survivors, merges) = sweep(vec![at(BASE, 2, 0), at(NEAR, 3, 1)], 0.85);
        assert_eq!(survivors.len(), 1);
        assert_eq!(merges.len(), 1);
        let keeper = &survivors[0];
        assert_eq!(keeper.content, NEAR);
        assert_eq!(keeper.helpful_count, 5);
        assert_eq!(keeper.strength(), 5.0);
        assert!((merges[0].similarity - 6.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_sweep_keeps_distinct() {
        let (survivors, merges) = sweep(
            vec![at(BASE, 1, 0), at("Draw a number line for negatives", 1, 1)],
            0.85,
        );
        assert_eq!(survivors.len(), 2);
        assert!(merges.is_empty());
    }

    #[test]
    fn test_similarity_at_threshold_not_merged() {
        // 1/2 overlap, threshold exactly 0.5
        let (survivors, _) = sweep(vec![at("alpha beta", 1, 0), at("alpha", 1, 1)], 0.5);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn test_keeper_continues_after_merge() {
        let (survivors, merges) = sweep(
            vec![
                at(BASE, 5, 0),
                at(NEAR, 1, 1),
                at("Always use the calculator for multiplication problems", 1, 2),
            ],
            0.85,
        );
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].content, BASE);
        assert_eq!(survivors[0].helpful_count, 7);
        assert_eq!(merges.len(), 2);
        assert!(merges.iter().all(|m| m.keeper == survivors[0].id));
    }

    #[test]
    fn test_sweep_is_order_independent() {
        let input = vec![at(NEAR, 1, 1), at("Draw a diagram", 1, 2), at(BASE, 1, 0)];
        let mut reversed = input.clone();
        reversed.reverse();
        let (a, _) = sweep(input, 0.85);
        let (b, _) = sweep(reversed, 0.85);
        assert_eq!(a, b);
    }
}
