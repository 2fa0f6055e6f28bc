//! End-to-end flight planning over a small survey area.
//!
//! Run with: cargo test -p survey-core --test planner_test

use survey_core::{
    Confinement, FlightPlan, FlightPlanner, NearestNeighbourTour, PlannerConfig, Point, Polygon,
    Scenario, ScenarioError, Sensor,
};

fn confinement() -> Confinement {
    Confinement::new(
        Point::new(-3.192473, 55.946233),
        Point::new(-3.184319, 55.942617),
    )
}

fn zones() -> Vec<Polygon> {
    vec![
        Polygon::rectangle(Point::new(-3.1905, 55.9435), Point::new(-3.1895, 55.9445)),
        Polygon::rectangle(Point::new(-3.1875, 55.9445), Point::new(-3.1865, 55.9455)),
        Polygon::new(vec![
            Point::new(-3.1912, 55.9452),
            Point::new(-3.1906, 55.9452),
            Point::new(-3.1909, 55.9458),
        ]),
    ]
}

fn sensors() -> Vec<Sensor> {
    [
        (-3.1915, 55.9430),
        (-3.1885, 55.9430),
        (-3.1860, 55.9432),
        (-3.1855, 55.9455),
        (-3.1890, 55.9455),
        (-3.1918, 55.9447),
        (-3.1900, 55.9450),
        (-3.1880, 55.9440),
    ]
    .iter()
    .enumerate()
    .map(|(i, &(lng, lat))| {
        Sensor::new(Point::new(lng, lat), 90.0 - i as f32, format!("{}.0", 40 + i))
    })
    .collect()
}

fn start() -> Point {
    Point::new(-3.1880, 55.9428)
}

fn survey_planner(config: PlannerConfig) -> FlightPlanner {
    FlightPlanner::new(confinement(), zones(), config)
}

fn assert_valid_plan(planner: &FlightPlanner, plan: &FlightPlan, sensors: &[Sensor], start: Point) {
    let config = planner.config();

    // Tour is a permutation of the sensors
    let mut tour = plan.tour.clone();
    tour.sort_unstable();
    assert_eq!(tour, (0..sensors.len()).collect::<Vec<_>>());

    // Every sensor is read exactly once, in tour order
    assert_eq!(plan.visited_sensors(), plan.tour);

    assert_eq!(plan.moves[0].start, start);
    assert!(plan.is_contiguous(), "Moves must chain end to start");

    for (i, step) in plan.moves.iter().enumerate() {
        assert!(
            (step.start.distance(&step.end) - config.move_length).abs() < 1e-12,
            "Move {} has the wrong length",
            i
        );
        assert_eq!(step.heading % 10, 0, "Move {} is off the heading grid", i);
        assert!((0..360).contains(&step.heading));
        assert!(
            !planner.field().segment_blocked(&step.start, &step.end),
            "Move {} crosses a no-fly zone or leaves the area",
            i
        );
    }

    // Legs line up with the moves and end where they should
    assert_eq!(plan.legs.len(), sensors.len() + 1);
    let mut end = 0;
    for summary in &plan.legs {
        assert!(summary.move_count >= 1);
        assert!(
            summary.move_count <= summary.move_bound,
            "Leg used {} moves, bound is {}",
            summary.move_count,
            summary.move_bound
        );
        end += summary.move_count;
        let arrival = &plan.moves[end - 1];
        match summary.target {
            Some(sensor) => {
                assert_eq!(arrival.visited_sensor, Some(sensor));
                assert!(arrival.end.distance(&sensors[sensor].location) < config.sensor_range);
            }
            None => assert!(arrival.end.distance(&start) < config.end_range),
        }
    }
    assert_eq!(end, plan.move_count());
}

/// Plan a full survey and check every property of the result.
#[test]
fn test_full_survey() {
    let planner = survey_planner(PlannerConfig::default());
    let sensors = sensors();

    let plan = planner.plan(start(), &sensors).expect("Survey should be plannable");
    assert_valid_plan(&planner, &plan, &sensors, start());
}

/// Same inputs, same moves, whether candidates run in parallel or not.
#[test]
fn test_planning_is_deterministic() {
    let sensors = sensors();
    let parallel = survey_planner(PlannerConfig::default())
        .plan(start(), &sensors)
        .unwrap();
    let again = survey_planner(PlannerConfig::default())
        .plan(start(), &sensors)
        .unwrap();
    let sequential = survey_planner(PlannerConfig {
        parallel_candidates: false,
        ..PlannerConfig::default()
    })
    .plan(start(), &sensors)
    .unwrap();

    assert_eq!(parallel.tour, again.tour);
    assert_eq!(parallel.moves, again.moves);
    assert_eq!(parallel.tour, sequential.tour);
    assert_eq!(parallel.moves, sequential.moves);
}

/// Replanning with a warm cache reuses legs and changes nothing.
#[test]
fn test_replan_hits_cache() {
    let planner = survey_planner(PlannerConfig::default());
    let sensors = sensors();

    let first = planner.plan(start(), &sensors).unwrap();
    let cached_legs = planner.cache().len();
    assert!(cached_legs >= sensors.len() + 1);

    let second = planner.plan(start(), &sensors).unwrap();
    assert_eq!(first.moves, second.moves);
    assert_eq!(planner.cache().len(), cached_legs);
    assert!(planner.cache().stats().hits >= (sensors.len() + 1) as u64);

    planner.reset();
    assert!(planner.cache().is_empty());
}

/// More candidates can only help: the chosen plan never gets longer.
#[test]
fn test_more_candidates_never_worse() {
    let sensors = sensors();
    let single = survey_planner(PlannerConfig {
        max_candidates: 1,
        ..PlannerConfig::default()
    })
    .plan(start(), &sensors)
    .unwrap();
    let several = survey_planner(PlannerConfig::default())
        .plan(start(), &sensors)
        .unwrap();

    assert!(several.move_count() <= single.move_count());
}

/// The plain nearest-neighbour strategy also yields a valid plan.
#[test]
fn test_nearest_neighbour_strategy() {
    let planner =
        survey_planner(PlannerConfig::default()).with_strategy(Box::new(NearestNeighbourTour));
    let sensors = sensors();

    let plan = planner.plan(start(), &sensors).unwrap();
    assert_valid_plan(&planner, &plan, &sensors, start());
}

/// A sensor nobody can reach yields a failure, not a panic.
#[test]
fn test_walled_in_sensor_fails() {
    let mut zones = zones();
    // Ring of walls around (-3.1860, 55.9432)
    zones.extend([
        Polygon::rectangle(Point::new(-3.1870, 55.9425), Point::new(-3.1850, 55.9427)),
        Polygon::rectangle(Point::new(-3.1870, 55.9437), Point::new(-3.1850, 55.9439)),
        Polygon::rectangle(Point::new(-3.1870, 55.9425), Point::new(-3.1868, 55.9439)),
        Polygon::rectangle(Point::new(-3.1852, 55.9425), Point::new(-3.1850, 55.9439)),
    ]);
    let planner = FlightPlanner::new(confinement(), zones, PlannerConfig::default());

    let result = planner.plan(start(), &sensors());
    assert!(result.is_err());
}

/// Scenarios load from JSON and are checked before planning.
#[test]
fn test_scenario_from_json() {
    let json = r#"{
        "confinement": {
            "north_west": { "lng": -3.192473, "lat": 55.946233 },
            "south_east": { "lng": -3.184319, "lat": 55.942617 }
        },
        "no_fly_zones": [
            [
                { "lng": -3.1905, "lat": 55.9435 },
                { "lng": -3.1895, "lat": 55.9435 },
                { "lng": -3.1895, "lat": 55.9445 },
                { "lng": -3.1905, "lat": 55.9445 },
                { "lng": -3.1905, "lat": 55.9435 }
            ]
        ],
        "sensors": [
            { "location": { "lng": -3.1915, "lat": 55.9430 }, "battery": 71.5, "reading": "45.0" },
            { "location": { "lng": -3.1885, "lat": 55.9455 }, "battery": 9.8, "reading": "NaN" }
        ],
        "start": { "lng": -3.1880, "lat": 55.9428 }
    }"#;

    let scenario = Scenario::from_json(json).expect("Scenario should parse");
    assert_eq!(scenario.no_fly_zones[0].vertices().len(), 4);
    assert_eq!(scenario.sensors[1].reading, "NaN");

    let planner = FlightPlanner::from_scenario(&scenario, PlannerConfig::default());
    let plan = planner.plan(scenario.start, &scenario.sensors).unwrap();
    assert_valid_plan(&planner, &plan, &scenario.sensors, scenario.start);

    let blocked = json.replace(
        r#""start": { "lng": -3.1880, "lat": 55.9428 }"#,
        r#""start": { "lng": -3.1900, "lat": 55.9440 }"#,
    );
    assert!(matches!(
        Scenario::from_json(&blocked),
        Err(ScenarioError::StartBlocked(_))
    ));
}
