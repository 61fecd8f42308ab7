/// Fields removed from every full-stat row.
///
/// Mostly request metadata added by the log shipper (geo lookup, host,
/// version) plus raw timing fields, which would otherwise make every row
/// unique. Consumers that need any of these must read the logs directly.
pub const FULL_STAT_EXCLUDED_FIELDS: &[&str] = &[
    "@timestamp",
    "appName",
    "request_time",
    "response_time",
    "@version",
    "host",
    "geoip_continent_code",
    "geoip_ip",
    "geoip_country_code2",
    "geoip_latitude",
    "geoip_country_code3",
    "geoip_location_lat",
    "geoip_location_lon",
    "geoip_longitude",
    "geoip_postal_code",
    "geoip_region_code",
    "geoip_region_name",
    "geoip_timezone",
    "user_ip",
];

pub(crate) const BODY: &str = "body";
pub(crate) const BARCODES: &str = "barcodes";
pub(crate) const QUERY: &str = "query";
pub(crate) const LENGTH_SUFFIX: &str = "_len";
