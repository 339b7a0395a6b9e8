use memsim::*;

fn span(sim: &Simulator, id: JobId) -> (Units, Units) {
    let region = sim.job(id)
        .and_then(|j| j.region)
        .and_then(|r| sim.table().get(r))
        .expect("job is not admitted");
    (region.start, region.start + region.length)
}

fn free_spans(sim: &Simulator) -> Vec<(Units, Units)> {
    sim.table()
        .iter()
        .filter(|r| r.owner.is_none())
        .map(|r| (r.start, r.start + r.length))
        .collect()
}

#[test]
fn whole_space_then_nothing() {
    let mut sim = Simulator::new(SimConfig::dynamic(100)).unwrap();
    let big = sim.submit("big", 100, 1).unwrap();
    assert_eq!(span(&sim, big), (0, 100));
    let small = sim.submit("small", 1, 1).unwrap();
    assert_eq!(sim.job(small).unwrap().state(), JobState::Waiting);
    assert_eq!(check_all(&sim), Ok(()));
}

#[test]
fn freed_region_merges_with_free_tail() {
    let mut sim = Simulator::new(SimConfig::dynamic(10)).unwrap();
    let a = sim.submit("A", 4, 2).unwrap();
    let b = sim.submit("B", 4, 1).unwrap();
    assert_eq!(span(&sim, a), (0, 4));
    assert_eq!(span(&sim, b), (4, 8));

    let report = sim.tick();
    assert_eq!(report.completed, vec![b]);
    assert_eq!(sim.job(a).unwrap().remaining_ticks, 1);
    // Releasing [4, 8) coalesces it with [8, 10) right away.
    assert_eq!(free_spans(&sim), vec![(4, 10)]);

    let c = sim.submit("C", 6, 3).unwrap();
    assert_eq!(span(&sim, c), (4, 10));
}

#[test]
fn waiting_job_needs_coalesced_space() {
    let mut sim = Simulator::new(SimConfig::dynamic(10)).unwrap();
    let a = sim.submit("A", 4, 2).unwrap();
    let _b = sim.submit("B", 4, 1).unwrap();
    sim.tick();
    // Only [4, 10) is free: 6 units are not enough.
    let c = sim.submit("C", 7, 3).unwrap();
    assert_eq!(sim.job(c).unwrap().state(), JobState::Waiting);

    let report = sim.tick();
    assert_eq!(report.completed, vec![a]);
    assert_eq!(report.newly_admitted, vec![c]);
    assert_eq!(span(&sim, c), (0, 7));
    assert_eq!(sim.job(c).unwrap().remaining_ticks, 3);
    assert_eq!(free_spans(&sim), vec![(7, 10)]);
}

#[test]
fn policies_diverge_on_hole_sizes() {
    for (policy, expected) in [(Policy::FirstFit, (0, 3)), (Policy::BestFit, (12, 15))] {
        // Leave a 10-unit hole, then a 4-unit one.
        let mut sim = Simulator::new(SimConfig::dynamic(20).with_policy(policy)).unwrap();
        sim.submit("hole10", 10, 1).unwrap();
        sim.submit("wall", 2, 5).unwrap();
        sim.submit("hole4", 4, 1).unwrap();
        sim.submit("tail", 4, 5).unwrap();
        sim.tick();
        assert_eq!(free_spans(&sim), vec![(0, 10), (12, 16)]);
        let j = sim.submit("probe", 3, 1).unwrap();
        assert_eq!(span(&sim, j), expected, "{policy}");
    }
}

#[test]
fn statistics_follow_the_run() {
    let mut sim = Simulator::new(SimConfig::dynamic(10)).unwrap();
    sim.submit("A", 6, 1).unwrap();
    sim.submit("B", 3, 2).unwrap();
    let w = sim.submit("W", 5, 1).unwrap();
    assert_eq!(sim.stats().occupancy, 9);

    sim.tick();
    // A expired, W moved in.
    let stats = sim.stats();
    assert_eq!(stats.occupancy, 8);
    assert_eq!(stats.peak_occupancy, 9);
    assert_eq!(stats.completed_count, 1);
    assert_eq!(stats.completed_size, 6);
    assert!(sim.job(w).unwrap().is_admitted());

    sim.tick();
    sim.tick();
    let stats = sim.stats();
    assert_eq!(stats.occupancy, 0);
    assert_eq!(stats.completed_count, 3);
    assert_eq!(stats.completed_size, 14);
    assert_eq!(stats.region_count, 1);
}

#[test]
fn single_user_partition() {
    // One fixed partition: whoever gets it holds all of it.
    let mut sim = Simulator::new(SimConfig::fixed(vec![900])).unwrap();
    let a = sim.submit("user", 10, 2).unwrap();
    assert_eq!(span(&sim, a), (0, 900));
    let b = sim.submit("next", 10, 1).unwrap();
    assert!(!sim.job(b).unwrap().is_admitted());
    assert_eq!(sim.stats().internal_waste, 890);
    sim.tick();
    sim.tick();
    assert!(sim.job(b).unwrap().is_admitted());
}

#[test]
fn replay_of_a_script() {
    let script = "op,name,size,ticks\n\
                  submit,A,4,2\n\
                  submit,B,4,1\n\
                  tick\n\
                  submit,C,7,3\n\
                  tick\n\
                  policy,best-fit\n\
                  submit,D,3,1\n";
    let mut sim = Simulator::new(SimConfig::dynamic(10)).unwrap();
    let errors = driver::apply_all(&mut sim, driver::parse_script(script).unwrap());
    assert!(errors.is_empty());
    let snap = sim.snapshot();
    assert_eq!(snap.now, 2);
    assert_eq!(snap.policy, Policy::BestFit);
    let names: Vec<&str> = snap.admitted.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, vec!["C", "D"]);
    assert_eq!(label::address_range(0, &snap.regions[1]), "0x7 - 0x9");
}
