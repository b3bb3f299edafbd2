use rand::Rng;

/// 按权重随机选出一个下标
///
/// `r` 在 `[0, total)` 内均匀取值, 按给定顺序依次扣减权重, 首个满足 `r < w` 的下标中选。
/// 权重为 0 的项永远不会被选中。遍历结束仍未命中时回落到最后一项。
/// 空切片或总权重为 0 时返回 `None`。
pub fn pick_weighted_index<R: Rng + ?Sized>(weights: &[u64], rng: &mut R) -> Option<usize> {
    let total: u64 = weights.iter().sum();
    if total == 0 {
        return None;
    }

    let mut r = rng.gen_range(0..total);
    for (i, &w) in weights.iter().enumerate() {
        if r < w {
            return Some(i);
        }
        r -= w;
    }

    Some(weights.len() - 1)
}
