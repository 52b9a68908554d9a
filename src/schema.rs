// Mirrors migrations/ (relational) and migrations_ts/ (time-series).
// The two tables live in different databases and are never joined.

diesel::table! {
    sensors (id) {
        id -> Int8,
        name -> Text,
    }
}

diesel::table! {
    sensor_data (id, last_seen) {
        id -> Int8,
        last_seen -> Timestamptz,
        battery_level -> Float8,
        temperature -> Nullable<Float8>,
        humidity -> Nullable<Float8>,
        velocity -> Nullable<Float8>,
    }
}
