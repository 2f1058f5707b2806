//! Tests for resource ordering

use std::cmp::Ordering;

use prometheus_lock_order::core::{
    compare, is_valid_order, validate_order, OrderError, ResourceClass, ResourceOrder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nothing {}

impl ResourceOrder for Nothing {
    const ALL: &'static [Self] = &[];

    fn rank(self) -> u32 {
        match self {}
    }

    fn label(self) -> &'static str {
        match self {}
    }
}

#[test]
fn test_resource_class_ranks() {
    assert_eq!(ResourceClass::ResourceA.rank(), 1);
    assert_eq!(ResourceClass::ResourceB.rank(), 2);
    assert_eq!(ResourceClass::ResourceA.to_string(), "resource_a(1)");
}

#[test]
fn test_compare_is_strict_for_distinct_classes() {
    assert_eq!(
        compare(ResourceClass::ResourceA, ResourceClass::ResourceB),
        Ordering::Less
    );
    assert_eq!(
        compare(ResourceClass::ResourceA, ResourceClass::ResourceA),
        Ordering::Equal
    );
    assert!(is_valid_order(ResourceClass::ResourceA, ResourceClass::ResourceB));
}

#[test]
fn test_empty_order_rejected() {
    assert_eq!(validate_order::<Nothing>(), Err(OrderError::Empty));
}

#[test]
fn test_resource_class_serde() {
    let json = serde_json::to_string(&ResourceClass::ResourceB).unwrap();
    assert_eq!(json, "\"resource_b\"");
}
