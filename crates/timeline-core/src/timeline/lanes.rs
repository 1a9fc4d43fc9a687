use chrono::NaiveDate;

/// Lane index per input item, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaneAssignment {
    pub lanes: Vec<usize>,
    pub lane_count: usize,
}

/// Packs inclusive day ranges into the fewest rows such that no two ranges in
/// a row overlap. Earlier starts are placed first, longer ranges first on ties.
pub fn assign_lanes(spans: &[(NaiveDate, NaiveDate)]) -> LaneAssignment {
    let mut order: Vec<usize> = (0..spans.len()).collect();
    order.sort_by(|&a, &b| {
        let (a_start, a_end) = spans[a];
        let (b_start, b_end) = spans[b];
        a_start.cmp(&b_start).then(b_end.cmp(&a_end)).then(a.cmp(&b))
    });

    // last occupied day per lane
    let mut lane_ends: Vec<NaiveDate> = Vec::new();
    let mut lanes = vec![0; spans.len()];

    for idx in order {
        let (start, end) = spans[idx];
        let slot = lane_ends.iter().position(|&last| last < start);
        let lane = match slot {
            Some(lane) => {
                lane_ends[lane] = end;
                lane
            }
            None => {
                lane_ends.push(end);
                lane_ends.len() - 1
            }
        };
        lanes[idx] = lane;
    }

    LaneAssignment {
        lanes,
        lane_count: lane_ends.len(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::assign_lanes;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).expect("valid date")
    }

    #[test]
    fn overlapping_ranges_get_separate_lanes() {
        let spans = vec![(date(1), date(5)), (date(3), date(8)), (date(6), date(9)), (date(10), date(10))];
        let assignment = assign_lanes(&spans);
        assert_eq!(assignment.lanes, vec![0, 1, 0, 0]);
        assert_eq!(assignment.lane_count, 2);
    }

    #[test]
    fn touching_ranges_do_not_share_a_lane() {
        let spans = vec![(date(1), date(5)), (date(5), date(6))];
        assert_eq!(assign_lanes(&spans).lanes, vec![0, 1]);
    }

    #[test]
    fn longer_range_wins_ties() {
        let spans = vec![(date(1), date(2)), (date(1), date(9))];
        assert_eq!(assign_lanes(&spans).lanes, vec![1, 0]);
    }

    #[test]
    fn empty_input() {
        let assignment = assign_lanes(&[]);
        assert_eq!(assignment.lane_count, 0);
        assert!(assignment.lanes.is_empty());
    }
}
