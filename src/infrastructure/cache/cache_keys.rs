pub fn trip_balances_key(trip_id: &str) -> String {
    format!("trip_balances:{}", trip_id)
}
