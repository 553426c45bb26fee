// Migrations - 所有迁移实现
//
// 每个迁移定义目标版本号，按版本号顺序执行

mod profile_schema_v1;

pub use profile_schema_v1::ProfileSchemaV1Migration;
