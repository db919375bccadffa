//! Object identifiers of the built-in PostgreSQL types.
//!
//! Values match `pg_type.dat` of the server catalog and are stable across releases.

pub const BOOL: u32 = 16;
pub const BYTEA: u32 = 17;
pub const QCHAR: u32 = 18;
pub const NAME: u32 = 19;
pub const INT8: u32 = 20;
pub const INT2: u32 = 21;
pub const INT4: u32 = 23;
pub const TEXT: u32 = 25;
pub const OID: u32 = 26;
pub const TID: u32 = 27;
pub const XID: u32 = 28;
pub const CID: u32 = 29;
pub const JSON: u32 = 114;
pub const JSON_ARRAY: u32 = 199;
pub const XML: u32 = 142;
pub const XML_ARRAY: u32 = 143;
pub const POINT: u32 = 600;
pub const LSEG: u32 = 601;
pub const PATH: u32 = 602;
pub const BOX: u32 = 603;
pub const POLYGON: u32 = 604;
pub const LINE: u32 = 628;
pub const LINE_ARRAY: u32 = 629;
pub const CIDR: u32 = 650;
pub const CIDR_ARRAY: u32 = 651;
pub const FLOAT4: u32 = 700;
pub const FLOAT8: u32 = 701;
pub const UNKNOWN: u32 = 705;
pub const CIRCLE: u32 = 718;
pub const CIRCLE_ARRAY: u32 = 719;
pub const MACADDR: u32 = 829;
pub const INET: u32 = 869;
pub const BOOL_ARRAY: u32 = 1000;
pub const BYTEA_ARRAY: u32 = 1001;
pub const QCHAR_ARRAY: u32 = 1002;
pub const NAME_ARRAY: u32 = 1003;
pub const INT2_ARRAY: u32 = 1005;
pub const INT4_ARRAY: u32 = 1007;
pub const TEXT_ARRAY: u32 = 1009;
pub const XID_ARRAY: u32 = 1011;
pub const CID_ARRAY: u32 = 1012;
pub const BPCHAR_ARRAY: u32 = 1014;
pub const VARCHAR_ARRAY: u32 = 1015;
pub const INT8_ARRAY: u32 = 1016;
pub const POINT_ARRAY: u32 = 1017;
pub const LSEG_ARRAY: u32 = 1018;
pub const PATH_ARRAY: u32 = 1019;
pub const BOX_ARRAY: u32 = 1020;
pub const FLOAT4_ARRAY: u32 = 1021;
pub const FLOAT8_ARRAY: u32 = 1022;
pub const POLYGON_ARRAY: u32 = 1027;
pub const OID_ARRAY: u32 = 1028;
pub const ACLITEM: u32 = 1033;
pub const ACLITEM_ARRAY: u32 = 1034;
pub const MACADDR_ARRAY: u32 = 1040;
pub const INET_ARRAY: u32 = 1041;
pub const BPCHAR: u32 = 1042;
pub const VARCHAR: u32 = 1043;
pub const DATE: u32 = 1082;
pub const TIME: u32 = 1083;
pub const TIMESTAMP: u32 = 1114;
pub const TIMESTAMP_ARRAY: u32 = 1115;
pub const DATE_ARRAY: u32 = 1182;
pub const TIME_ARRAY: u32 = 1183;
pub const TIMESTAMPTZ: u32 = 1184;
pub const TIMESTAMPTZ_ARRAY: u32 = 1185;
pub const INTERVAL: u32 = 1186;
pub const INTERVAL_ARRAY: u32 = 1187;
pub const NUMERIC_ARRAY: u32 = 1231;
pub const BIT: u32 = 1560;
pub const BIT_ARRAY: u32 = 1561;
pub const VARBIT: u32 = 1562;
pub const VARBIT_ARRAY: u32 = 1563;
pub const NUMERIC: u32 = 1700;
pub const RECORD: u32 = 2249;
pub const RECORD_ARRAY: u32 = 2287;
pub const UUID: u32 = 2950;
pub const UUID_ARRAY: u32 = 2951;
pub const JSONB: u32 = 3802;
pub const JSONB_ARRAY: u32 = 3807;
pub const INT4_RANGE: u32 = 3904;
pub const INT4_RANGE_ARRAY: u32 = 3905;
pub const NUM_RANGE: u32 = 3906;
pub const NUM_RANGE_ARRAY: u32 = 3907;
pub const TS_RANGE: u32 = 3908;
pub const TS_RANGE_ARRAY: u32 = 3909;
pub const TSTZ_RANGE: u32 = 3910;
pub const TSTZ_RANGE_ARRAY: u32 = 3911;
pub const DATE_RANGE: u32 = 3912;
pub const DATE_RANGE_ARRAY: u32 = 3913;
pub const INT8_RANGE: u32 = 3926;
pub const INT8_RANGE_ARRAY: u32 = 3927;
pub const JSONPATH: u32 = 4072;
pub const JSONPATH_ARRAY: u32 = 4073;
pub const INT4_MULTIRANGE: u32 = 4451;
pub const NUM_MULTIRANGE: u32 = 4532;
pub const TS_MULTIRANGE: u32 = 4533;
pub const TSTZ_MULTIRANGE: u32 = 4534;
pub const DATE_MULTIRANGE: u32 = 4535;
pub const INT8_MULTIRANGE: u32 = 4536;
pub const XID8: u32 = 5069;
pub const XID8_ARRAY: u32 = 271;
pub const INT4_MULTIRANGE_ARRAY: u32 = 6150;
pub const NUM_MULTIRANGE_ARRAY: u32 = 6151;
pub const TS_MULTIRANGE_ARRAY: u32 = 6152;
pub const TSTZ_MULTIRANGE_ARRAY: u32 = 6153;
pub const DATE_MULTIRANGE_ARRAY: u32 = 6155;
pub const INT8_MULTIRANGE_ARRAY: u32 = 6157;
