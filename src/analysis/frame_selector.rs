use super::classifier::MotionState;

/// Maps a final state sequence and its tame/tsume preservation flags into an
/// ordered sequence of source frame indices, with repetition, per spec.md
/// §4.5.
///
/// Within a run of length `L` starting at `start`, state determines a
/// stride: HIGH -> 2 ("on twos"), MID -> 3 ("on threes"), LOW -> 1 (every
/// frame held). The k-th emitted slot of the run samples source index
/// `start + stride * (k / stride)` — this single formula produces the
/// repeated-pair/triple pattern and naturally holds the last drawing
/// through any trailing incomplete group, without a separate boundary case.
/// A slot whose frame is flagged `preserved` bypasses the stride grouping
/// entirely and samples its own source index, since tame/tsume frames must
/// be emitted verbatim rather than merged into a neighbor's held drawing.
pub fn build_output_plan(states: &[MotionState], preserved: &[bool]) -> Vec<usize> {
    let mut plan = Vec::with_capacity(states.len());
    let mut start = 0;
    while start < states.len() {
        let state = states[start];
        let mut end = start;
        while end < states.len() && states[end] == state {
            end += 1;
        }
        let run_len = end - start;
        let stride = stride_for(state);
        for k in 0..run_len {
            let source = start + k;
            if preserved.get(source).copied().unwrap_or(false) {
                plan.push(source);
            } else {
                plan.push(start + stride * (k / stride));
            }
        }
        start = end;
    }
    plan
}

fn stride_for(state: MotionState) -> usize {
    match state {
        MotionState::High => 2,
        MotionState::Mid => 3,
        MotionState::Low => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_preservation(len: usize) -> Vec<bool> {
        vec![false; len]
    }

    #[test]
    fn constant_mid_emits_triples() {
        let states = vec![MotionState::Mid; 9];
        let plan = build_output_plan(&states, &no_preservation(9));
        assert_eq!(plan, vec![0, 0, 0, 3, 3, 3, 6, 6, 6]);
    }

    #[test]
    fn constant_high_emits_pairs() {
        let states = vec![MotionState::High; 6];
        let plan = build_output_plan(&states, &no_preservation(6));
        assert_eq!(plan, vec![0, 0, 2, 2, 4, 4]);
    }

    #[test]
    fn low_run_preserves_every_frame() {
        let states = vec![MotionState::Low; 5];
        let plan = build_output_plan(&states, &no_preservation(5));
        assert_eq!(plan, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn step_low_then_high_matches_scenario() {
        let mut states = vec![MotionState::Low; 10];
        states.extend(vec![MotionState::High; 10]);
        let plan = build_output_plan(&states, &no_preservation(20));
        assert_eq!(&plan[..10], &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(&plan[10..], &[10, 10, 12, 12, 14, 14, 16, 16, 18, 18]);
    }

    #[test]
    fn plan_length_equals_input_length() {
        let states = vec![MotionState::High, MotionState::High, MotionState::High, MotionState::Mid, MotionState::Mid, MotionState::Low];
        let plan = build_output_plan(&states, &no_preservation(states.len()));
        assert_eq!(plan.len(), states.len());
    }

    #[test]
    fn plan_is_monotonically_non_decreasing() {
        let mut states = vec![MotionState::High; 7];
        states.extend(vec![MotionState::Mid; 8]);
        states.extend(vec![MotionState::Low; 4]);
        let plan = build_output_plan(&states, &no_preservation(states.len()));
        assert!(plan.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn preserved_frame_is_emitted_verbatim_inside_a_held_run() {
        let states = vec![MotionState::High; 4];
        let mut preserved = no_preservation(4);
        preserved[1] = true;
        let plan = build_output_plan(&states, &preserved);
        assert_eq!(plan, vec![0, 1, 2, 2]);
    }
}
